use crate::errors::{ConfigError, EvolutionError};
use crate::genome::{Genome, GenomeId, IdSequence};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use std::num::NonZeroUsize;
use std::sync::Arc;

/// Configuration data for the bootstrap fitness EA.
///
/// # Note
/// All quantities expressing probabilities should be in
/// the range [0.0, 1.0]; construction through
/// [`FitnessEa::new`] rejects values outside it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Size of the bootstrap population.
    pub population_size: NonZeroUsize,
    /// Top n copied unchanged into the next generation.
    pub elitism: usize,
    /// Top fraction of each generation eligible as parents.
    pub survival_threshold: f64,
    /// Chance that offspring will be the result of sexual
    /// reproduction (as opposed to asexual).
    pub sexual_reproduction_chance: f64,
    /// Maximum attempts to produce a structurally
    /// decodable offspring before the run aborts.
    pub max_reproduction_attempts: NonZeroUsize,
}

impl BootstrapConfig {
    /// Returns a "zero-valued" default configuration.
    /// All values are 0, or in the case of
    /// `NonZeroUsize`s, 1.
    ///
    /// # Note
    /// This value is not suitable for use in most
    /// experiments. It is meant as a way to abbreviate
    /// configuration instantiation.
    pub const fn zero() -> BootstrapConfig {
        BootstrapConfig {
            // SAFETY: 1 is a valid NonZeroUsize. Replace this with
            // NonZeroUsize::new(1).unwrap() once const Option::unwrap
            // becomes stable.
            population_size: unsafe { NonZeroUsize::new_unchecked(1) },
            elitism: 0,
            survival_threshold: 0.0,
            sexual_reproduction_chance: 0.0,
            max_reproduction_attempts: unsafe { NonZeroUsize::new_unchecked(1) },
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("survival_threshold", self.survival_threshold),
            (
                "sexual_reproduction_chance",
                self.sexual_reproduction_chance,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ProbabilityOutOfRange {
                    parameter: name,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// The result of one bootstrap seed-evolution run.
///
/// Exceeding the evaluation budget is an explicit,
/// recoverable outcome: the caller restarts with a fresh
/// random population rather than looping indefinitely.
#[derive(Clone, Debug)]
pub enum SeedOutcome<G> {
    /// Enough viable seed genomes were found.
    Success { genomes: Vec<G>, evaluations: u64 },
    /// The evaluation budget ran out first.
    BudgetExceeded { evaluations: u64 },
}

/// A compact generational, objective-driven EA.
///
/// This is *not* the coevolutionary engine; it exists to
/// bootstrap the first viable seed population before MCC
/// proper starts, when there is no opposing population to
/// define a criterion against. Selection is truncation
/// (top [`survival_threshold`]) with [`elitism`] copied
/// through unchanged.
///
/// [`survival_threshold`]: BootstrapConfig::survival_threshold
/// [`elitism`]: BootstrapConfig::elitism
pub struct FitnessEa<G: Genome> {
    population: Vec<G>,
    config: BootstrapConfig,
    genetic_config: G::Config,
    ids: Arc<IdSequence>,
    rng: StdRng,
    generation: usize,
}

impl<G: Genome> FitnessEa<G> {
    /// Creates a fitness EA over a fresh random population.
    pub fn new(
        config: BootstrapConfig,
        genetic_config: G::Config,
        ids: Arc<IdSequence>,
        rng_seed: u64,
    ) -> Result<FitnessEa<G>, ConfigError> {
        config.validate()?;
        let mut ea = FitnessEa {
            population: Vec::new(),
            config,
            genetic_config,
            ids,
            rng: StdRng::seed_from_u64(rng_seed),
            generation: 0,
        };
        ea.randomize();
        Ok(ea)
    }

    /// Replaces the population with fresh random genomes
    /// and resets the generation count. Used when a seed
    /// run exceeds its budget and restarts.
    ///
    /// # Panics
    /// Panics if random genome generation keeps producing
    /// degenerate genomes past the configured attempt
    /// bound, which indicates an unusable genetic
    /// configuration.
    pub fn randomize(&mut self) {
        self.population.clear();
        self.generation = 0;
        self.fill_random();
    }

    /// Tops the population up to its configured size with
    /// fresh random, decodable genomes.
    fn fill_random(&mut self) {
        let size = self.config.population_size.get();
        let attempts = self.config.max_reproduction_attempts.get();
        while self.population.len() < size {
            let genome = (0..attempts)
                .find_map(|_| {
                    let candidate = G::random(
                        self.ids.next_id(),
                        self.generation,
                        &self.genetic_config,
                        &mut self.rng,
                    );
                    candidate.decode(&self.genetic_config).is_some().then(|| candidate)
                })
                .unwrap_or_else(|| {
                    panic!(
                        "random genome generation produced no decodable genome in {} attempts",
                        attempts
                    )
                });
            self.population.push(genome);
        }
    }

    /// Scores every member with `objective`, then replaces
    /// the population with the next generation: the elite
    /// unchanged, the rest bred from the surviving top
    /// fraction.
    ///
    /// If external removals (see [`remove`]) have drained
    /// the population completely, it is refilled with
    /// random genomes instead of bred.
    ///
    /// [`remove`]: FitnessEa::remove
    ///
    /// # Errors
    /// Returns an error if reproduction cannot produce a
    /// decodable offspring within the configured attempt
    /// bound.
    pub fn evolve_generation<F>(&mut self, mut objective: F) -> Result<(), EvolutionError>
    where
        F: FnMut(&G) -> f64,
    {
        if self.population.is_empty() {
            self.fill_random();
        }
        for genome in &mut self.population {
            let fitness = objective(genome);
            let info = genome.evaluation_info_mut();
            info.fitness = fitness;
            info.evaluation_count += 1;
        }
        self.population.sort_by(|a, b| {
            b.evaluation_info()
                .fitness
                .partial_cmp(&a.evaluation_info().fitness)
                .unwrap_or_else(|| panic!("invalid genome fitnesses detected (NaN)"))
        });

        let size = self.config.population_size.get();
        let survivors = ((self.population.len() as f64 * self.config.survival_threshold).ceil()
            as usize)
            .clamp(1, self.population.len());
        let elite = self.config.elitism.min(self.population.len());

        self.generation += 1;
        let mut next: Vec<G> = self.population[..elite].to_vec();
        while next.len() < size {
            next.push(self.breed_from_survivors(survivors)?);
        }
        self.population = next;
        Ok(())
    }

    fn breed_from_survivors(&mut self, survivors: usize) -> Result<G, EvolutionError> {
        let parent = self.population[..survivors]
            .choose(&mut self.rng)
            .unwrap_or_else(|| panic!("no surviving parents to breed from"))
            .clone();
        let attempts = self.config.max_reproduction_attempts.get();
        for _ in 0..attempts {
            let id = self.ids.next_id();
            let sexual =
                survivors > 1 && self.rng.gen::<f64>() < self.config.sexual_reproduction_chance;
            let child = if sexual {
                let partner = self.population[..survivors]
                    .choose(&mut self.rng)
                    .unwrap_or_else(|| panic!("no surviving parents to breed from"))
                    .clone();
                G::mate(
                    &parent,
                    &partner,
                    id,
                    self.generation,
                    &self.genetic_config,
                    &mut self.rng,
                )
            } else {
                parent.spawn(id, self.generation, &self.genetic_config, &mut self.rng)
            };
            if child.decode(&self.genetic_config).is_some() {
                return Ok(child);
            }
        }
        Err(EvolutionError::ReproductionFailed {
            parent: parent.id(),
            attempts,
        })
    }

    pub fn population(&self) -> &[G] {
        &self.population
    }

    /// Removes and returns the genome with the given
    /// identifier, shrinking the breeding pool. The seed
    /// evolver uses this to force diversity: a collected
    /// solver leaves the pool instead of being recollected.
    pub fn remove(&mut self, id: GenomeId) -> Option<G> {
        let index = self.population.iter().position(|g| g.id() == id)?;
        Some(self.population.remove(index))
    }

    /// Returns the currently best-scored genome.
    ///
    /// # Panics
    /// Panics if the population is empty.
    pub fn champion(&self) -> &G {
        self.population
            .iter()
            .max_by(|a, b| {
                a.evaluation_info()
                    .fitness
                    .partial_cmp(&b.evaluation_info().fitness)
                    .unwrap_or_else(|| panic!("invalid genome fitnesses detected (NaN)"))
            })
            .unwrap_or_else(|| panic!("empty population has no champion"))
    }

    pub fn generation(&self) -> usize {
        self.generation
    }
}
