use crate::control::RunState;
use crate::errors::{EvolutionError, SeedingError};
use crate::evaluation::MccEvaluator;
use crate::genome::{Genome, IdSequence};
use crate::logging::Stats;
use crate::populations::{allot_proportional, partition_into_queues, QueueConfig, SpeciesQueue};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use std::sync::Arc;

/// Statistics describing one completed generation tick
/// of a [`QueueingEa`].
#[derive(Clone, Debug)]
pub struct GenerationReport {
    /// Number of completed generations, including this one.
    pub generation: usize,
    /// Offspring produced this tick.
    pub batch_size: usize,
    /// Offspring that satisfied the minimal criterion and
    /// entered the population.
    pub accepted: usize,
    /// Offspring that failed the criterion and were lost.
    pub discarded: usize,
    /// Population size after turnover.
    pub population_size: usize,
    /// Trials run by this EA's evaluator so far.
    pub evaluations: u64,
    /// Structural complexity of the population.
    pub complexity: Stats,
    /// Best recorded objective value in the population.
    pub champion_fitness: f64,
}

/// A steady-state evolutionary algorithm with queue-based
/// (age-ordered) population turnover.
///
/// Each generation tick selects a batch of parents,
/// produces offspring, evaluates them against the opposing
/// population through the minimal-criterion evaluator, and
/// admits exactly the viable ones; each admission retires
/// the oldest member of the offspring's own species queue.
/// Offspring failing the criterion are discarded, never
/// retried: mutation is cheap, and retrying would bias the
/// search.
///
/// Selection pressure beyond the criterion is deliberately
/// absent; there is no fitness ranking anywhere in the
/// turnover path.
pub struct QueueingEa<G: Genome, E: MccEvaluator<G>> {
    queues: Vec<SpeciesQueue<G>>,
    evaluator: E,
    config: QueueConfig,
    genetic_config: G::Config,
    ids: Arc<IdSequence>,
    rng: StdRng,
    generation: usize,
    state: RunState,
}

impl<G: Genome, E: MccEvaluator<G>> QueueingEa<G, E> {
    /// Creates a queueing EA over the given seed
    /// population, pre-clustered into the configured
    /// number of species queues.
    ///
    /// Construction validates the configuration and checks
    /// every seed genome decodes; it does *not* evaluate
    /// the seeds. Seed evaluation runs via [`initialize`]
    /// once the MCC container has cross-wired both
    /// evaluators, since viability is defined relative to
    /// the opposing population.
    ///
    /// [`initialize`]: QueueingEa::initialize
    pub fn new(
        seed: Vec<G>,
        evaluator: E,
        config: QueueConfig,
        genetic_config: G::Config,
        ids: Arc<IdSequence>,
        rng_seed: u64,
    ) -> Result<QueueingEa<G, E>, SeedingError> {
        config.validate()?;
        if seed.len() > config.max_size.get() {
            return Err(SeedingError::OversizedSeed {
                supplied: seed.len(),
                bound: config.max_size.get(),
            });
        }
        if seed.len() < config.species_count.get() {
            return Err(SeedingError::InsufficientSeeds {
                supplied: seed.len(),
                required: config.species_count.get(),
            });
        }
        for genome in &seed {
            if genome.decode(&genetic_config).is_none() {
                return Err(SeedingError::DegenerateSeed { genome: genome.id() });
            }
        }

        let queues = partition_into_queues(
            seed,
            config.species_count.get(),
            config.max_size.get(),
            &genetic_config,
        );
        Ok(QueueingEa {
            queues,
            evaluator,
            config,
            genetic_config,
            ids,
            rng: StdRng::seed_from_u64(rng_seed),
            generation: 0,
            state: RunState::Ready,
        })
    }

    /// Evaluates the current (seed) population once and
    /// verifies every member satisfies its minimal
    /// criterion. Called by the MCC container after
    /// cross-wiring, before the first generation.
    pub fn initialize(&mut self) -> Result<(), SeedingError> {
        for index in 0..self.queues.len() {
            let mut members = self.queues[index].take_all();
            self.evaluator.evaluate_batch(&mut members, self.generation);
            if let Some(failed) = members.iter().find(|g| !g.evaluation_info().is_viable) {
                return Err(SeedingError::NonViableSeed { genome: failed.id() });
            }
            for genome in members {
                self.queues[index].seed(genome);
            }
        }
        Ok(())
    }

    /// Advances the population by one generation tick.
    ///
    /// # Errors
    /// Returns an error if reproduction cannot produce a
    /// decodable offspring within the configured attempt
    /// bound. Offspring failing their minimal criterion
    /// are an expected outcome, not an error.
    pub fn evolve_generation(&mut self) -> Result<GenerationReport, EvolutionError> {
        self.state = RunState::Running;
        let sizes: Vec<usize> = self.queues.iter().map(|q| q.len()).collect();
        let allotment = allot_proportional(&sizes, self.config.batch_size.get());

        let mut offspring = Vec::with_capacity(self.config.batch_size.get());
        let mut origins = Vec::with_capacity(self.config.batch_size.get());
        for (queue_index, &count) in allotment.iter().enumerate() {
            for _ in 0..count {
                offspring.push(self.reproduce_from_queue(queue_index)?);
                origins.push(queue_index);
            }
        }

        let batch_size = offspring.len();
        self.evaluator.evaluate_batch(&mut offspring, self.generation);

        let mut accepted = 0;
        for (child, queue_index) in offspring.into_iter().zip(origins) {
            if child.evaluation_info().is_viable {
                self.queues[queue_index].push_evicting(child);
                accepted += 1;
            }
        }

        self.generation += 1;
        Ok(GenerationReport {
            generation: self.generation,
            batch_size,
            accepted,
            discarded: batch_size - accepted,
            population_size: self.population_len(),
            evaluations: self.evaluator.evaluation_count(),
            complexity: Stats::from(self.population().map(|g| g.complexity())),
            champion_fitness: self
                .champion()
                .map(|g| g.evaluation_info().fitness)
                .unwrap_or(0.0),
        })
    }

    /// Produces one decodable offspring from a parent
    /// sampled out of the given queue, retrying degenerate
    /// decodes up to the configured bound.
    fn reproduce_from_queue(&mut self, queue_index: usize) -> Result<G, EvolutionError> {
        let parent = self.queues[queue_index]
            .sample_parent(&mut self.rng)
            .clone();
        let attempts = self.config.max_reproduction_attempts.get();
        for _ in 0..attempts {
            let id = self.ids.next_id();
            let sexual = self.queues[queue_index].len() > 1
                && self.rng.gen::<f64>() < self.config.sexual_reproduction_chance;
            let child = if sexual {
                let partner = self.queues[queue_index]
                    .sample_parent(&mut self.rng)
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

    /// Returns an iterator over all current genomes.
    pub fn population(&self) -> impl Iterator<Item = &G> {
        self.queues.iter().flat_map(|q| q.genomes())
    }

    pub fn population_len(&self) -> usize {
        self.queues.iter().map(|q| q.len()).sum()
    }

    /// Clones the current population into an immutable
    /// snapshot, for handing to the opposing evaluator.
    pub fn snapshot(&self) -> Vec<G> {
        self.population().cloned().collect()
    }

    /// Returns an iterator over the species queues.
    pub fn queues(&self) -> impl Iterator<Item = &SpeciesQueue<G>> {
        self.queues.iter()
    }

    /// Returns the number of completed generations.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: RunState) {
        self.state = state;
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn evaluator_mut(&mut self) -> &mut E {
        &mut self.evaluator
    }

    /// Returns the genome with the best recorded objective
    /// value, for external monitoring. MCC itself never
    /// selects on this.
    pub fn champion(&self) -> Option<&G> {
        self.population().max_by(|a, b| {
            a.evaluation_info()
                .fitness
                .partial_cmp(&b.evaluation_info().fitness)
                .unwrap_or_else(|| panic!("invalid genome fitnesses detected (NaN)"))
        })
    }

    /// Returns statistics over the population's structural
    /// complexity.
    pub fn complexity_stats(&self) -> Stats {
        Stats::from(self.population().map(|g| g.complexity()))
    }

    /// Discards population and evaluator state, returning
    /// the EA to `Ready` with an empty population. A fresh
    /// seed must be supplied through [`reseed`] before the
    /// EA can run again.
    ///
    /// [`reseed`]: QueueingEa::reseed
    pub fn reset(&mut self) {
        for queue in &mut self.queues {
            queue.clear();
        }
        self.evaluator.reset();
        self.generation = 0;
        self.state = RunState::Ready;
    }

    /// Replaces the population with a fresh seed,
    /// re-clustering it into species queues.
    pub fn reseed(&mut self, seed: Vec<G>) -> Result<(), SeedingError> {
        if seed.len() > self.config.max_size.get() {
            return Err(SeedingError::OversizedSeed {
                supplied: seed.len(),
                bound: self.config.max_size.get(),
            });
        }
        if seed.len() < self.config.species_count.get() {
            return Err(SeedingError::InsufficientSeeds {
                supplied: seed.len(),
                required: self.config.species_count.get(),
            });
        }
        for genome in &seed {
            if genome.decode(&self.genetic_config).is_none() {
                return Err(SeedingError::DegenerateSeed { genome: genome.id() });
            }
        }
        self.queues = partition_into_queues(
            seed,
            self.config.species_count.get(),
            self.config.max_size.get(),
            &self.genetic_config,
        );
        self.generation = 0;
        self.state = RunState::Ready;
        Ok(())
    }
}
