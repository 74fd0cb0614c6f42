//! The bridge between evolved maze genomes and
//! simulation-ready worlds: a per-generation cache of
//! decoded maze configurations keyed by genome identity,
//! with per-maze success accounting for resource-limited
//! MCC.

use crate::genomics::{MazeGenome, MazeGeneticConfig};
use crate::geometry::{Point, Segment};
use crate::structure::MazeStructure;
use crate::world::MazeNavigationWorld;

use ahash::RandomState;
use oximcc::{Genome, GenomeId};

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A cached, decoded maze: simulation-domain walls,
/// endpoints, the trial budget, and the mutable count of
/// successful navigations agents have scored against it.
#[derive(Debug)]
pub struct MazeConfiguration {
    genome_id: GenomeId,
    walls: Arc<Vec<Segment>>,
    start: Point,
    goal: Point,
    max_timesteps: usize,
    max_distance: f64,
    successful_navigations: AtomicUsize,
}

impl MazeConfiguration {
    fn from_structure(genome_id: GenomeId, structure: MazeStructure) -> MazeConfiguration {
        let max_distance = structure.max_distance();
        MazeConfiguration {
            genome_id,
            walls: Arc::new(structure.walls),
            start: structure.start,
            goal: structure.goal,
            max_timesteps: structure.max_timesteps,
            max_distance,
            successful_navigations: AtomicUsize::new(0),
        }
    }

    pub fn genome_id(&self) -> GenomeId {
        self.genome_id
    }

    pub fn successful_navigations(&self) -> usize {
        self.successful_navigations.load(Ordering::Relaxed)
    }
}

/// Manufactures [`MazeNavigationWorld`]s for the current
/// maze population, caching decoded phenomes by genome
/// identity so a maze is decoded once per lifetime in the
/// population, not once per trial.
///
/// The success counters are the one piece of shared
/// mutable state touched by concurrent agent evaluations;
/// they are atomics, and criterion-relevant increments go
/// through [`try_claim_success`] so a resource cap can
/// neither overshoot nor double-count.
///
/// [`try_claim_success`]: MultiMazeWorldFactory::try_claim_success
#[derive(Debug)]
pub struct MultiMazeWorldFactory {
    genetic_config: MazeGeneticConfig,
    min_success_distance: f64,
    configurations: Vec<MazeConfiguration>,
    index_of: HashMap<GenomeId, usize, RandomState>,
}

impl MultiMazeWorldFactory {
    pub fn new(
        genetic_config: MazeGeneticConfig,
        min_success_distance: f64,
    ) -> MultiMazeWorldFactory {
        MultiMazeWorldFactory {
            genetic_config,
            min_success_distance,
            configurations: Vec::new(),
            index_of: HashMap::default(),
        }
    }

    /// Mirrors the cache onto the given maze population:
    /// newly seen genomes are decoded and inserted
    /// (counters starting at zero), cached entries for
    /// retired genomes are evicted, and surviving entries
    /// keep their walls and success counts. Afterwards the
    /// cache's key set equals the population's id set
    /// exactly, in population order.
    ///
    /// # Panics
    /// Panics if a population genome fails to decode. The
    /// queueing EA only admits decodable genomes, so this
    /// indicates genome corruption, which is fatal.
    pub fn set_maze_configurations(&mut self, mazes: &[MazeGenome]) {
        let mut retained: HashMap<GenomeId, MazeConfiguration, RandomState> = self
            .configurations
            .drain(..)
            .map(|configuration| (configuration.genome_id, configuration))
            .collect();
        self.configurations = mazes
            .iter()
            .map(|genome| {
                retained.remove(&genome.id()).unwrap_or_else(|| {
                    let structure = genome.decode(&self.genetic_config).unwrap_or_else(|| {
                        panic!("maze genome {} in population does not decode", genome.id())
                    });
                    MazeConfiguration::from_structure(genome.id(), structure)
                })
            })
            .collect();
        self.index_of = self
            .configurations
            .iter()
            .enumerate()
            .map(|(index, configuration)| (configuration.genome_id, index))
            .collect();
    }

    pub fn maze_count(&self) -> usize {
        self.configurations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }

    /// Returns the cached maze genome ids, in population
    /// order.
    pub fn genome_ids(&self) -> impl Iterator<Item = GenomeId> + '_ {
        self.configurations.iter().map(|c| c.genome_id)
    }

    pub fn genome_id_at(&self, index: usize) -> GenomeId {
        self.configurations[index].genome_id
    }

    pub fn configuration(&self, id: GenomeId) -> Option<&MazeConfiguration> {
        self.index_of.get(&id).map(|&index| &self.configurations[index])
    }

    /// Builds a fresh world over the cached maze at
    /// `index`. Worlds share the cached wall list; calling
    /// this concurrently for any indices is safe.
    pub fn create_maze_navigation_world(&self, index: usize) -> MazeNavigationWorld {
        let configuration = &self.configurations[index];
        MazeNavigationWorld::new(
            Arc::clone(&configuration.walls),
            configuration.start,
            configuration.goal,
            configuration.max_timesteps,
            self.min_success_distance,
            configuration.max_distance,
        )
    }

    /// Number of successful navigations recorded against
    /// the maze at `index`.
    pub fn successful_navigation_count(&self, index: usize) -> usize {
        self.configurations[index].successful_navigations()
    }

    /// Records one successful navigation of the maze at
    /// `index`, regardless of any resource limit.
    pub fn increment_successful_maze_navigation_count(&self, index: usize) {
        self.configurations[index]
            .successful_navigations
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Whether the maze at `index` still has capacity
    /// under the given resource limit. `None` means
    /// unlimited.
    pub fn is_maze_under_resource_limit(
        &self,
        index: usize,
        limit: Option<NonZeroUsize>,
    ) -> bool {
        limit.map_or(true, |bound| {
            self.successful_navigation_count(index) < bound.get()
        })
    }

    /// Atomically claims one unit of the maze's success
    /// capacity. Returns whether the claim succeeded;
    /// under a limit of `k`, exactly `k` claims can ever
    /// succeed no matter how many evaluations race.
    pub fn try_claim_success(&self, index: usize, limit: Option<NonZeroUsize>) -> bool {
        let counter = &self.configurations[index].successful_navigations;
        match limit {
            None => {
                counter.fetch_add(1, Ordering::Relaxed);
                true
            }
            Some(bound) => counter
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |count| {
                    (count < bound.get()).then(|| count + 1)
                })
                .is_ok(),
        }
    }

    /// Drops every cached configuration and counter.
    pub fn reset(&mut self) {
        self.configurations.clear();
        self.index_of.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use oximcc::Genome;

    fn config() -> MazeGeneticConfig {
        MazeGeneticConfig {
            width: 300.0,
            height: 300.0,
            passage_width: 30.0,
            endpoint_offset: 15.0,
            initial_wall_count: 1,
            max_wall_count: NonZeroUsize::new(4).unwrap(),
            base_timesteps: 100,
            timesteps_per_wall: 25,
            ..MazeGeneticConfig::zero()
        }
    }

    fn decodable_mazes(count: u64) -> Vec<MazeGenome> {
        let config = config();
        let mut rng = StdRng::seed_from_u64(40);
        (0..count)
            .map(|id| loop {
                let genome = MazeGenome::random(id, 0, &config, &mut rng);
                if genome.decode(&config).is_some() {
                    break genome;
                }
            })
            .collect()
    }

    #[test]
    fn cache_mirrors_the_population() {
        let mut factory = MultiMazeWorldFactory::new(config(), 5.0);
        let mazes = decodable_mazes(3);
        factory.set_maze_configurations(&mazes);
        assert_eq!(factory.genome_ids().collect::<Vec<_>>(), vec![0, 1, 2]);

        // Second generation: genome 0 retired, genome 3 new.
        let mut next: Vec<MazeGenome> = mazes[1..].to_vec();
        next.extend(decodable_mazes(4).drain(3..));
        factory.set_maze_configurations(&next);
        assert_eq!(factory.genome_ids().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(factory.configuration(0).is_none());
    }

    #[test]
    fn surviving_entries_keep_their_counters() {
        let mut factory = MultiMazeWorldFactory::new(config(), 5.0);
        let mazes = decodable_mazes(2);
        factory.set_maze_configurations(&mazes);
        factory.increment_successful_maze_navigation_count(1);
        factory.increment_successful_maze_navigation_count(1);

        factory.set_maze_configurations(&mazes[1..]);
        assert_eq!(factory.successful_navigation_count(0), 2);
    }

    #[test]
    fn resource_limit_admits_exactly_k_claims() {
        let mut factory = MultiMazeWorldFactory::new(config(), 5.0);
        factory.set_maze_configurations(&decodable_mazes(1));
        let limit = NonZeroUsize::new(1);

        // Five agents solve the maze; only one solve is
        // attributable under a limit of 1.
        let claims: Vec<bool> = (0..5).map(|_| factory.try_claim_success(0, limit)).collect();
        assert_eq!(claims.iter().filter(|c| **c).count(), 1);
        assert!(claims[0]);
        assert_eq!(factory.successful_navigation_count(0), 1);
        assert!(!factory.is_maze_under_resource_limit(0, limit));
        assert!(factory.is_maze_under_resource_limit(0, NonZeroUsize::new(2)));
    }

    #[test]
    fn unlimited_claims_always_succeed() {
        let mut factory = MultiMazeWorldFactory::new(config(), 5.0);
        factory.set_maze_configurations(&decodable_mazes(1));
        for _ in 0..10 {
            assert!(factory.try_claim_success(0, None));
        }
        assert_eq!(factory.successful_navigation_count(0), 10);
    }

    #[test]
    fn worlds_share_the_cached_structure() {
        let mut factory = MultiMazeWorldFactory::new(config(), 7.5);
        factory.set_maze_configurations(&decodable_mazes(1));
        let world = factory.create_maze_navigation_world(0);
        assert_eq!(world.min_success_distance(), 7.5);
        assert_eq!(world.start(), Point::new(15.0, 15.0));
        assert_eq!(world.goal(), Point::new(285.0, 285.0));
    }
}
