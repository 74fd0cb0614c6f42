//! Seed-population evolution: MCC needs a starting agent
//! population that already satisfies its minimal
//! criterion against the seed mazes, so an auxiliary
//! fitness-driven EA evolves navigators maze by maze
//! before coevolution proper begins.

use crate::evaluators::{AgentNavigationEvaluator, EvaluationMode, MazeViabilityEvaluator};
use crate::factory::MultiMazeWorldFactory;
use crate::genomics::{MazeGenome, MazeGeneticConfig, NavigatorGenome, NavigatorGeneticConfig};
use crate::world::MazeNavigationWorld;

use oximcc::logging::{RunPhase, SharedLogger};
use oximcc::{
    BootstrapConfig, ConfigError, EvaluationCounter, EvolutionError, FitnessEa, Genome, GenomeId,
    IdSequence, MccEvaluator, SeedOutcome,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use std::error::Error;
use std::fmt;
use std::num::{NonZeroU64, NonZeroUsize};
use std::sync::Arc;

/// Configuration data for seed-population evolution.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeedEvolverConfig {
    /// The internal fitness EA's parameters.
    pub bootstrap: BootstrapConfig,
    /// Unique successful navigators required overall.
    pub target_solver_count: NonZeroUsize,
    /// Successful navigators collected per seed maze
    /// before moving to the next.
    pub solvers_per_maze: NonZeroUsize,
    /// Explicitly unsuccessful navigators collected per
    /// seed maze; they supply failure evidence for the
    /// maze-side criterion during verification.
    pub nonsolvers_per_maze: usize,
    /// Trial budget for one whole attempt. Exhausting it
    /// restarts with a fresh random population.
    pub evaluation_budget: NonZeroU64,
    /// Restarts allowed before giving up.
    pub max_restarts: usize,
    /// Goal distance below which a trial counts as solved.
    pub min_success_distance: f64,
    /// Agent-side criterion used during verification.
    pub mazes_solved_criterion: NonZeroUsize,
    /// Maze-side solver requirement used during
    /// verification.
    pub agents_solved_criterion: NonZeroUsize,
    /// Maze-side failure requirement used during
    /// verification.
    pub agents_failed_criterion: usize,
}

/// The verified product of seed evolution.
#[derive(Clone, Debug)]
pub struct SeedReport {
    /// Navigators satisfying the agent criterion against
    /// the seed mazes.
    pub agents: Vec<NavigatorGenome>,
    /// Trials spent, across restarts.
    pub evaluations: u64,
    /// Restarts taken before success.
    pub restarts: usize,
}

/// A fatal seed-evolution failure. Budget exhaustion
/// within one attempt is *not* here; it restarts
/// internally, and failure surfaces only once restarts
/// run out.
#[derive(Debug)]
pub enum SeedingFailure {
    /// The bootstrap configuration was rejected.
    Config(ConfigError),
    /// The internal EA could not reproduce decodable
    /// offspring.
    Evolution(EvolutionError),
    /// A seed maze failed to decode.
    DegenerateSeedMaze { genome: GenomeId },
    /// No seed mazes were supplied.
    NoSeedMazes,
    /// Every attempt ran out of budget or failed
    /// verification.
    RestartBudgetExhausted { restarts: usize, evaluations: u64 },
}

impl fmt::Display for SeedingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => e.fmt(f),
            Self::Evolution(e) => e.fmt(f),
            Self::DegenerateSeedMaze { genome } => {
                write!(f, "seed maze genome {} does not decode", genome)
            }
            Self::NoSeedMazes => write!(f, "seed evolution requires at least one seed maze"),
            Self::RestartBudgetExhausted {
                restarts,
                evaluations,
            } => write!(
                f,
                "no verifiable seed population after {} restarts and {} evaluations",
                restarts, evaluations
            ),
        }
    }
}

impl Error for SeedingFailure {}

/// Evolves and verifies the seed navigator population.
///
/// One attempt works through the seed mazes in order,
/// evolving the shared population against each maze until
/// enough solvers are collected, then keeps evolving
/// against randomly chosen mazes until the overall
/// unique-solver target is met. Collected solvers are
/// *removed* from the evolving pool, shrinking it, so
/// later collections are forced onto different lineages
/// instead of re-collecting the same genome.
///
/// The assembled population is then cross-verified: every
/// returned navigator satisfies the agent criterion
/// against the seed mazes, and every seed maze satisfies
/// the maze criterion against the returned navigators, so
/// the MCC container can admit both sides unchanged.
pub struct SeedEvolver {
    config: SeedEvolverConfig,
    navigator_config: NavigatorGeneticConfig,
    maze_config: MazeGeneticConfig,
    ids: Arc<IdSequence>,
    counter: EvaluationCounter,
    logger: Option<SharedLogger>,
}

impl SeedEvolver {
    pub fn new(
        config: SeedEvolverConfig,
        navigator_config: NavigatorGeneticConfig,
        maze_config: MazeGeneticConfig,
        ids: Arc<IdSequence>,
        counter: EvaluationCounter,
    ) -> SeedEvolver {
        SeedEvolver {
            config,
            navigator_config,
            maze_config,
            ids,
            counter,
            logger: None,
        }
    }

    /// Routes the verification evaluators' trial rows to
    /// the given logger (as [`RunPhase::Initialization`]).
    pub fn with_logger(mut self, logger: SharedLogger) -> SeedEvolver {
        self.logger = Some(logger);
        self
    }

    /// Runs seed evolution with restart-on-exhaustion
    /// semantics, returning the verified seed navigators.
    pub fn evolve_seed_agents(
        &self,
        seed_mazes: &[MazeGenome],
        rng_seed: u64,
    ) -> Result<SeedReport, SeedingFailure> {
        if seed_mazes.is_empty() {
            return Err(SeedingFailure::NoSeedMazes);
        }
        let worlds: Vec<MazeNavigationWorld> = seed_mazes
            .iter()
            .map(|genome| {
                genome
                    .decode(&self.maze_config)
                    .map(|structure| {
                        MazeNavigationWorld::from_structure(
                            &structure,
                            self.config.min_success_distance,
                        )
                    })
                    .ok_or(SeedingFailure::DegenerateSeedMaze { genome: genome.id() })
            })
            .collect::<Result<_, _>>()?;

        let mut evaluations = 0;
        for restart in 0..=self.config.max_restarts {
            match self.attempt(&worlds, rng_seed.wrapping_add(restart as u64))? {
                SeedOutcome::Success {
                    genomes,
                    evaluations: spent,
                } => {
                    evaluations += spent;
                    if let Some(agents) = self.verify(genomes, seed_mazes) {
                        return Ok(SeedReport {
                            agents,
                            evaluations,
                            restarts: restart,
                        });
                    }
                }
                SeedOutcome::BudgetExceeded { evaluations: spent } => evaluations += spent,
            }
        }
        Err(SeedingFailure::RestartBudgetExhausted {
            restarts: self.config.max_restarts,
            evaluations,
        })
    }

    /// One bootstrap attempt over a fresh random
    /// population.
    fn attempt(
        &self,
        worlds: &[MazeNavigationWorld],
        rng_seed: u64,
    ) -> Result<SeedOutcome<NavigatorGenome>, SeedingFailure> {
        let config = &self.config;
        let mut ea = FitnessEa::new(
            config.bootstrap.clone(),
            self.navigator_config.clone(),
            Arc::clone(&self.ids),
            rng_seed,
        )
        .map_err(SeedingFailure::Config)?;
        let mut rng = StdRng::seed_from_u64(rng_seed.wrapping_add(0x5eed));
        let budget = config.evaluation_budget.get();
        let mut evaluations = 0u64;
        let mut solvers: Vec<NavigatorGenome> = Vec::new();
        let mut nonsolvers: Vec<NavigatorGenome> = Vec::new();

        for world in worlds {
            let mut collected = 0;
            while collected < config.solvers_per_maze.get() {
                if evaluations >= budget {
                    return Ok(SeedOutcome::BudgetExceeded { evaluations });
                }
                self.step(&mut ea, world, &mut evaluations)?;
                collected += harvest(
                    &mut ea,
                    world,
                    config.min_success_distance,
                    &mut solvers,
                    config.solvers_per_maze.get() - collected,
                );
            }
            let threshold = world.max_distance() - config.min_success_distance;
            nonsolvers.extend(
                ea.population()
                    .iter()
                    .filter(|g| g.evaluation_info().fitness <= threshold)
                    .take(config.nonsolvers_per_maze)
                    .cloned(),
            );
        }

        while solvers.len() < config.target_solver_count.get() {
            if evaluations >= budget {
                return Ok(SeedOutcome::BudgetExceeded { evaluations });
            }
            let world = worlds
                .choose(&mut rng)
                .unwrap_or_else(|| panic!("seed maze set is empty"));
            self.step(&mut ea, world, &mut evaluations)?;
            let remaining = config.target_solver_count.get() - solvers.len();
            harvest(
                &mut ea,
                world,
                config.min_success_distance,
                &mut solvers,
                remaining,
            );
        }

        let mut genomes = solvers;
        genomes.extend(nonsolvers);
        Ok(SeedOutcome::Success {
            genomes,
            evaluations,
        })
    }

    /// One generation of the bootstrap EA against one
    /// maze, with every trial counted.
    fn step(
        &self,
        ea: &mut FitnessEa<NavigatorGenome>,
        world: &MazeNavigationWorld,
        evaluations: &mut u64,
    ) -> Result<(), SeedingFailure> {
        let navigator_config = &self.navigator_config;
        let counter = &self.counter;
        ea.evolve_generation(|genome| {
            *evaluations += 1;
            counter.increment();
            let mut network = genome.decode(navigator_config).unwrap_or_else(|| {
                panic!(
                    "navigator genome {} in bootstrap population does not decode",
                    genome.id()
                )
            });
            world.run_fitness_trial(&mut network).fitness
        })
        .map_err(SeedingFailure::Evolution)
    }

    /// Cross-evaluates the assembled seed navigators and
    /// the seed mazes against each other. Navigators
    /// failing the agent criterion are dropped; the
    /// verification succeeds if enough navigators remain
    /// and every seed maze satisfies the maze criterion
    /// against them.
    fn verify(
        &self,
        mut agents: Vec<NavigatorGenome>,
        seed_mazes: &[MazeGenome],
    ) -> Option<Vec<NavigatorGenome>> {
        let mut agent_evaluator = AgentNavigationEvaluator::new(
            MultiMazeWorldFactory::new(
                self.maze_config.clone(),
                self.config.min_success_distance,
            ),
            self.navigator_config.clone(),
            self.config.mazes_solved_criterion,
            None,
            self.counter.clone(),
        )
        .with_mode(EvaluationMode::Sequential)
        .with_phase(RunPhase::Initialization);
        if let Some(logger) = &self.logger {
            agent_evaluator = agent_evaluator.with_logger(Arc::clone(logger));
        }
        agent_evaluator.update_opponents(seed_mazes);
        agent_evaluator.evaluate_batch(&mut agents, 0);
        agents.retain(|genome| genome.evaluation_info().is_viable);
        if agents.len() < self.config.target_solver_count.get() {
            return None;
        }

        let mut maze_evaluator = MazeViabilityEvaluator::new(
            self.maze_config.clone(),
            self.navigator_config.clone(),
            self.config.min_success_distance,
            self.config.agents_solved_criterion,
            self.config.agents_failed_criterion,
            self.counter.clone(),
        )
        .with_mode(EvaluationMode::Sequential)
        .with_phase(RunPhase::Initialization);
        if let Some(logger) = &self.logger {
            maze_evaluator = maze_evaluator.with_logger(Arc::clone(logger));
        }
        maze_evaluator.update_opponents(&agents);
        let mut mazes = seed_mazes.to_vec();
        maze_evaluator.evaluate_batch(&mut mazes, 0);
        mazes
            .iter()
            .all(|maze| maze.evaluation_info().is_viable)
            .then(|| agents)
    }
}

/// Moves every current solver of `world` (up to `limit`)
/// out of the EA's pool into `solvers`.
fn harvest(
    ea: &mut FitnessEa<NavigatorGenome>,
    world: &MazeNavigationWorld,
    min_success_distance: f64,
    solvers: &mut Vec<NavigatorGenome>,
    limit: usize,
) -> usize {
    let threshold = world.max_distance() - min_success_distance;
    let ids: Vec<GenomeId> = ea
        .population()
        .iter()
        .filter(|g| g.evaluation_info().fitness > threshold)
        .map(|g| g.id())
        .take(limit)
        .collect();
    let mut collected = 0;
    for id in ids {
        if let Some(genome) = ea.remove(id) {
            solvers.push(genome);
            collected += 1;
        }
    }
    collected
}
