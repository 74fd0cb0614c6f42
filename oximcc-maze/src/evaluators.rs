//! The two minimal-criterion evaluators coupling the
//! navigator and maze populations.
//!
//! A navigator is viable when it solves enough distinct
//! mazes (each maze contributing at most its resource
//! capacity of countable solves); a maze is viable when
//! enough navigators solve it *and* enough fail it, so
//! the population drifts toward mazes that are neither
//! trivial nor impossible. Failing a criterion is an
//! expected outcome and never an error.

use crate::factory::MultiMazeWorldFactory;
use crate::genomics::{MazeGenome, MazeGeneticConfig, NavigatorGenome, NavigatorGeneticConfig};
use crate::networks::NavigatorNetwork;
use crate::world::MazeNavigationWorld;
use crate::behavior::BehaviorCharacterizationKind;

use oximcc::logging::{LoggableElement, RunPhase, SharedLogger};
use oximcc::{EvaluationCounter, Genome, GenomeId, MccEvaluator};
use rayon::prelude::*;

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

/// How a batch of offspring is fanned out over trials.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvaluationMode {
    /// Data-parallel over the offspring batch.
    Parallel,
    /// In batch order on the calling thread. Verdicts for
    /// a given population state match the parallel mode
    /// unless a resource limit makes claim order matter;
    /// use this mode for reproducible debugging runs.
    Sequential,
}

/// Field names of the per-trial log row shared by both
/// evaluators.
pub const TRIAL_LOG_FIELDS: [&str; 9] = [
    "generation",
    "evaluation",
    "run_phase",
    "candidate",
    "opponent",
    "solved",
    "viable_so_far",
    "distance_to_goal",
    "timesteps",
];

fn trial_row(
    generation: usize,
    evaluation: u64,
    run_phase: RunPhase,
    candidate: GenomeId,
    opponent: GenomeId,
    solved: bool,
    viable_so_far: bool,
    distance_to_goal: f64,
    timesteps: usize,
) -> [LoggableElement; 9] {
    [
        LoggableElement::new("generation", generation),
        LoggableElement::new("evaluation", evaluation),
        LoggableElement::new("run_phase", run_phase),
        LoggableElement::new("candidate", candidate),
        LoggableElement::new("opponent", opponent),
        LoggableElement::new("solved", solved),
        LoggableElement::new("viable_so_far", viable_so_far),
        LoggableElement::new("distance_to_goal", format!("{:.3}", distance_to_goal)),
        LoggableElement::new("timesteps", timesteps),
    ]
}

fn log_trial(logger: &Option<SharedLogger>, row: &[LoggableElement]) {
    if let Some(logger) = logger {
        logger
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .log_row(row);
    }
}

/// Minimal-criterion evaluator for navigator offspring:
/// runs a candidate against the cached maze population,
/// one maze at a time, until it has solved
/// `mazes_solved_criterion` mazes (short-circuiting the
/// rest) or no mazes remain. Mazes at their resource cap
/// are skipped, since a capped maze can no longer
/// contribute a countable solve.
pub struct AgentNavigationEvaluator {
    factory: MultiMazeWorldFactory,
    navigator_config: NavigatorGeneticConfig,
    mazes_solved_criterion: NonZeroUsize,
    resource_limit: Option<NonZeroUsize>,
    behavior_kind: BehaviorCharacterizationKind,
    counter: EvaluationCounter,
    evaluations: AtomicU64,
    logger: Option<SharedLogger>,
    mode: EvaluationMode,
    run_phase: RunPhase,
}

impl AgentNavigationEvaluator {
    pub fn new(
        factory: MultiMazeWorldFactory,
        navigator_config: NavigatorGeneticConfig,
        mazes_solved_criterion: NonZeroUsize,
        resource_limit: Option<NonZeroUsize>,
        counter: EvaluationCounter,
    ) -> AgentNavigationEvaluator {
        AgentNavigationEvaluator {
            factory,
            navigator_config,
            mazes_solved_criterion,
            resource_limit,
            behavior_kind: BehaviorCharacterizationKind::EndPoint,
            counter,
            evaluations: AtomicU64::new(0),
            logger: None,
            mode: EvaluationMode::Parallel,
            run_phase: RunPhase::Primary,
        }
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> AgentNavigationEvaluator {
        self.logger = Some(logger);
        self
    }

    pub fn with_mode(mut self, mode: EvaluationMode) -> AgentNavigationEvaluator {
        self.mode = mode;
        self
    }

    pub fn with_phase(mut self, run_phase: RunPhase) -> AgentNavigationEvaluator {
        self.run_phase = run_phase;
        self
    }

    pub fn with_behavior(
        mut self,
        behavior_kind: BehaviorCharacterizationKind,
    ) -> AgentNavigationEvaluator {
        self.behavior_kind = behavior_kind;
        self
    }

    /// The cached maze ids currently judged against, in
    /// population order.
    pub fn maze_ids(&self) -> Vec<GenomeId> {
        self.factory.genome_ids().collect()
    }

    pub fn factory(&self) -> &MultiMazeWorldFactory {
        &self.factory
    }

    fn evaluate_one(&self, genome: &mut NavigatorGenome, generation: usize) {
        let mut network = genome.decode(&self.navigator_config).unwrap_or_else(|| {
            panic!(
                "navigator genome {} in offspring batch does not decode",
                genome.id()
            )
        });
        let required = self.mazes_solved_criterion.get();
        let mut solved = 0;
        let mut trials = 0;
        let mut best_fitness = f64::NEG_INFINITY;
        let mut best_behavior = Vec::new();

        for index in 0..self.factory.maze_count() {
            if solved >= required {
                break;
            }
            if !self
                .factory
                .is_maze_under_resource_limit(index, self.resource_limit)
            {
                continue;
            }
            let world = self.factory.create_maze_navigation_world(index);
            let (outcome, behavior) = world.run_behavior_trial(&mut network, self.behavior_kind);
            trials += 1;
            let evaluation = self.counter.increment();
            self.evaluations.fetch_add(1, Ordering::Relaxed);

            if outcome.goal_reached
                && self.factory.try_claim_success(index, self.resource_limit)
            {
                solved += 1;
            }
            if outcome.fitness > best_fitness {
                best_fitness = outcome.fitness;
                best_behavior = behavior;
            }
            log_trial(
                &self.logger,
                &trial_row(
                    generation,
                    evaluation,
                    self.run_phase,
                    genome.id(),
                    self.factory.genome_id_at(index),
                    outcome.goal_reached,
                    solved >= required,
                    outcome.final_distance,
                    outcome.timesteps,
                ),
            );
        }

        let info = genome.evaluation_info_mut();
        info.is_viable = solved >= required;
        info.evaluation_count += trials;
        info.fitness = best_fitness.max(0.0);
        info.behavior = best_behavior;
    }
}

impl MccEvaluator<NavigatorGenome> for AgentNavigationEvaluator {
    type Opponent = MazeGenome;

    fn update_opponents(&mut self, opponents: &[MazeGenome]) {
        self.factory.set_maze_configurations(opponents);
    }

    fn evaluate_batch(&mut self, offspring: &mut [NavigatorGenome], generation: usize) {
        match self.mode {
            EvaluationMode::Parallel => {
                let this: &AgentNavigationEvaluator = self;
                offspring
                    .par_iter_mut()
                    .for_each(|genome| this.evaluate_one(genome, generation));
            }
            EvaluationMode::Sequential => {
                for genome in offspring.iter_mut() {
                    self.evaluate_one(genome, generation);
                }
            }
        }
    }

    fn evaluation_count(&self) -> u64 {
        self.evaluations.load(Ordering::Relaxed)
    }

    fn reset(&mut self) {
        self.factory.reset();
        self.evaluations.store(0, Ordering::Relaxed);
    }
}

/// Minimal-criterion evaluator for maze offspring: runs a
/// candidate maze against the decoded navigator
/// population until at least `agents_solved_criterion`
/// navigators have solved it and at least
/// `agents_failed_criterion` have failed it, or no
/// navigators remain. Both requirements must hold for
/// viability; a failure requirement of zero disables the
/// not-impossible half.
pub struct MazeViabilityEvaluator {
    maze_config: MazeGeneticConfig,
    navigator_config: NavigatorGeneticConfig,
    agents: Vec<(GenomeId, NavigatorNetwork)>,
    min_success_distance: f64,
    agents_solved_criterion: NonZeroUsize,
    agents_failed_criterion: usize,
    counter: EvaluationCounter,
    evaluations: AtomicU64,
    logger: Option<SharedLogger>,
    mode: EvaluationMode,
    run_phase: RunPhase,
}

impl MazeViabilityEvaluator {
    pub fn new(
        maze_config: MazeGeneticConfig,
        navigator_config: NavigatorGeneticConfig,
        min_success_distance: f64,
        agents_solved_criterion: NonZeroUsize,
        agents_failed_criterion: usize,
        counter: EvaluationCounter,
    ) -> MazeViabilityEvaluator {
        MazeViabilityEvaluator {
            maze_config,
            navigator_config,
            agents: Vec::new(),
            min_success_distance,
            agents_solved_criterion,
            agents_failed_criterion,
            counter,
            evaluations: AtomicU64::new(0),
            logger: None,
            mode: EvaluationMode::Parallel,
            run_phase: RunPhase::Primary,
        }
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> MazeViabilityEvaluator {
        self.logger = Some(logger);
        self
    }

    pub fn with_mode(mut self, mode: EvaluationMode) -> MazeViabilityEvaluator {
        self.mode = mode;
        self
    }

    pub fn with_phase(mut self, run_phase: RunPhase) -> MazeViabilityEvaluator {
        self.run_phase = run_phase;
        self
    }

    /// The decoded navigator ids currently judged against,
    /// in population order.
    pub fn agent_ids(&self) -> Vec<GenomeId> {
        self.agents.iter().map(|(id, _)| *id).collect()
    }

    fn evaluate_one(&self, genome: &mut MazeGenome, generation: usize) {
        let structure = genome.decode(&self.maze_config).unwrap_or_else(|| {
            panic!(
                "maze genome {} in offspring batch does not decode",
                genome.id()
            )
        });
        let world = MazeNavigationWorld::from_structure(&structure, self.min_success_distance);
        let required_solved = self.agents_solved_criterion.get();
        let required_failed = self.agents_failed_criterion;
        let mut solved = 0;
        let mut failed = 0;
        let mut trials = 0;

        for (agent_id, prototype) in &self.agents {
            if solved >= required_solved && failed >= required_failed {
                break;
            }
            let mut network = prototype.clone();
            let outcome = world.run_fitness_trial(&mut network);
            trials += 1;
            let evaluation = self.counter.increment();
            self.evaluations.fetch_add(1, Ordering::Relaxed);

            if outcome.goal_reached {
                solved += 1;
            } else {
                failed += 1;
            }
            log_trial(
                &self.logger,
                &trial_row(
                    generation,
                    evaluation,
                    self.run_phase,
                    genome.id(),
                    *agent_id,
                    outcome.goal_reached,
                    solved >= required_solved && failed >= required_failed,
                    outcome.final_distance,
                    outcome.timesteps,
                ),
            );
        }

        let info = genome.evaluation_info_mut();
        info.is_viable = solved >= required_solved && failed >= required_failed;
        info.evaluation_count += trials;
        info.fitness = solved as f64;
    }
}

impl MccEvaluator<MazeGenome> for MazeViabilityEvaluator {
    type Opponent = NavigatorGenome;

    fn update_opponents(&mut self, opponents: &[NavigatorGenome]) {
        self.agents = opponents
            .iter()
            .map(|genome| {
                let network = genome.decode(&self.navigator_config).unwrap_or_else(|| {
                    panic!(
                        "navigator genome {} in population does not decode",
                        genome.id()
                    )
                });
                (genome.id(), network)
            })
            .collect();
    }

    fn evaluate_batch(&mut self, offspring: &mut [MazeGenome], generation: usize) {
        match self.mode {
            EvaluationMode::Parallel => {
                let this: &MazeViabilityEvaluator = self;
                offspring
                    .par_iter_mut()
                    .for_each(|genome| this.evaluate_one(genome, generation));
            }
            EvaluationMode::Sequential => {
                for genome in offspring.iter_mut() {
                    self.evaluate_one(genome, generation);
                }
            }
        }
    }

    fn evaluation_count(&self) -> u64 {
        self.evaluations.load(Ordering::Relaxed)
    }

    fn reset(&mut self) {
        self.agents.clear();
        self.evaluations.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::NeuronGene;
    use crate::networks::{OUTPUT_COUNT, SENSOR_COUNT};
    use oximcc::logging::MemoryLogger;

    fn navigator_config() -> NavigatorGeneticConfig {
        NavigatorGeneticConfig {
            initial_hidden_count: NonZeroUsize::new(1).unwrap(),
            max_hidden_count: NonZeroUsize::new(2).unwrap(),
            weight_bound: 5.0,
            initial_weight_power: 1.0,
            ..NavigatorGeneticConfig::zero()
        }
    }

    fn maze_config() -> MazeGeneticConfig {
        MazeGeneticConfig {
            width: 300.0,
            height: 300.0,
            passage_width: 30.0,
            endpoint_offset: 15.0,
            max_wall_count: NonZeroUsize::new(4).unwrap(),
            base_timesteps: 400,
            ..MazeGeneticConfig::zero()
        }
    }

    fn zero_neuron() -> NeuronGene {
        NeuronGene {
            input_weights: [0.0; SENSOR_COUNT + 1],
            recurrent_weight: 0.0,
            output_weights: [0.0; OUTPUT_COUNT],
        }
    }

    /// Thrusts but never turns; in an open maze it drives
    /// along the +x boundary and never nears the far
    /// corner goal.
    fn runner(id: u64) -> NavigatorGenome {
        NavigatorGenome::new(id, 0, vec![zero_neuron()], [0.0, 6.0])
    }

    /// Never moves at all.
    fn idler(id: u64) -> NavigatorGenome {
        NavigatorGenome::new(id, 0, vec![zero_neuron()], [0.0, 0.0])
    }

    fn open_maze(id: u64) -> MazeGenome {
        MazeGenome::new(id, 0, Vec::new())
    }

    /// An evaluator whose success distance exceeds the
    /// maze diagonal: every navigator solves every maze on
    /// timestep zero.
    fn instant_success_evaluator(
        mazes_solved: usize,
        resource_limit: Option<NonZeroUsize>,
    ) -> AgentNavigationEvaluator {
        AgentNavigationEvaluator::new(
            MultiMazeWorldFactory::new(maze_config(), 500.0),
            navigator_config(),
            NonZeroUsize::new(mazes_solved).unwrap(),
            resource_limit,
            EvaluationCounter::default(),
        )
        .with_mode(EvaluationMode::Sequential)
    }

    #[test]
    fn criterion_satisfaction_short_circuits() {
        let mut evaluator = instant_success_evaluator(2, None);
        evaluator.update_opponents(&[open_maze(0), open_maze(1), open_maze(2), open_maze(3)]);
        let mut offspring = vec![runner(10)];
        evaluator.evaluate_batch(&mut offspring, 0);

        let info = offspring[0].evaluation_info();
        assert!(info.is_viable);
        // Two solves satisfy the criterion; the remaining
        // two mazes are never tried.
        assert_eq!(info.evaluation_count, 2);
        assert_eq!(evaluator.evaluation_count(), 2);
    }

    #[test]
    fn unsolved_mazes_leave_the_candidate_non_viable() {
        let mut evaluator = AgentNavigationEvaluator::new(
            MultiMazeWorldFactory::new(maze_config(), 5.0),
            navigator_config(),
            NonZeroUsize::new(1).unwrap(),
            None,
            EvaluationCounter::default(),
        )
        .with_mode(EvaluationMode::Sequential);
        evaluator.update_opponents(&[open_maze(0), open_maze(1)]);
        let mut offspring = vec![idler(10)];
        evaluator.evaluate_batch(&mut offspring, 0);

        let info = offspring[0].evaluation_info();
        assert!(!info.is_viable);
        // Every maze was tried before giving up.
        assert_eq!(info.evaluation_count, 2);
    }

    #[test]
    fn capped_mazes_stop_counting_toward_the_criterion() {
        let mut evaluator = instant_success_evaluator(1, NonZeroUsize::new(1));
        evaluator.update_opponents(&[open_maze(0)]);

        let mut first = vec![runner(10)];
        evaluator.evaluate_batch(&mut first, 0);
        assert!(first[0].evaluation_info().is_viable);

        // The single maze is now at its cap: later
        // candidates have nothing left to solve.
        let mut second = vec![runner(11)];
        evaluator.evaluate_batch(&mut second, 0);
        let info = second[0].evaluation_info();
        assert!(!info.is_viable);
        assert_eq!(info.evaluation_count, 0);
        assert_eq!(evaluator.factory().successful_navigation_count(0), 1);
    }

    #[test]
    fn parallel_and_sequential_agree_without_resource_limits() {
        let opponents: Vec<MazeGenome> = (0..3).map(open_maze).collect();
        let mut offspring_parallel: Vec<NavigatorGenome> =
            (0..6).map(|id| if id % 2 == 0 { runner(id) } else { idler(id) }).collect();
        let mut offspring_sequential = offspring_parallel.clone();

        let mut parallel = instant_success_evaluator(3, None).with_mode(EvaluationMode::Parallel);
        parallel.update_opponents(&opponents);
        parallel.evaluate_batch(&mut offspring_parallel, 0);

        let mut sequential = instant_success_evaluator(3, None);
        sequential.update_opponents(&opponents);
        sequential.evaluate_batch(&mut offspring_sequential, 0);

        for (a, b) in offspring_parallel.iter().zip(&offspring_sequential) {
            assert_eq!(a.evaluation_info().is_viable, b.evaluation_info().is_viable);
            assert_eq!(
                a.evaluation_info().evaluation_count,
                b.evaluation_info().evaluation_count
            );
        }
    }

    #[test]
    fn maze_criterion_needs_both_solvers_and_failures() {
        let counter = EvaluationCounter::default();
        let mut evaluator = MazeViabilityEvaluator::new(
            maze_config(),
            navigator_config(),
            500.0,
            NonZeroUsize::new(1).unwrap(),
            1,
            counter.clone(),
        )
        .with_mode(EvaluationMode::Sequential);

        // Success distance 500 means every navigator
        // solves: there can be no failures.
        evaluator.update_opponents(&[runner(0), runner(1)]);
        let mut offspring = vec![open_maze(10)];
        evaluator.evaluate_batch(&mut offspring, 0);
        assert!(!offspring[0].evaluation_info().is_viable);
        assert_eq!(offspring[0].evaluation_info().fitness, 2.0);
        assert_eq!(counter.value(), 2);
    }

    #[test]
    fn maze_criterion_with_mixed_agents_is_satisfied() {
        // Success distance 280 on a 300×300 open maze: the
        // runner's straight path along the top boundary
        // crosses it, while the idler never leaves the
        // start (~382 from the goal).
        let mut evaluator = MazeViabilityEvaluator::new(
            maze_config(),
            navigator_config(),
            280.0,
            NonZeroUsize::new(1).unwrap(),
            1,
            EvaluationCounter::default(),
        )
        .with_mode(EvaluationMode::Sequential);
        evaluator.update_opponents(&[runner(0), idler(1)]);
        let mut offspring = vec![open_maze(10)];
        evaluator.evaluate_batch(&mut offspring, 0);
        let info = offspring[0].evaluation_info();
        assert!(info.is_viable);
        assert_eq!(info.evaluation_count, 2);
    }

    #[test]
    fn trials_produce_log_rows() {
        let memory = std::sync::Arc::new(std::sync::Mutex::new(MemoryLogger::default()));
        let logger: oximcc::logging::SharedLogger = memory.clone();
        let mut evaluator = instant_success_evaluator(1, None).with_logger(logger);
        evaluator.update_opponents(&[open_maze(0)]);
        let mut offspring = vec![runner(10)];
        evaluator.evaluate_batch(&mut offspring, 3);

        let lock = memory.lock().unwrap();
        assert_eq!(lock.rows.len(), 1);
        let row: Vec<(&str, &str)> = lock.rows[0]
            .iter()
            .map(|e| (e.name, e.value.as_str()))
            .collect();
        assert_eq!(row[0], ("generation", "3"));
        assert_eq!(row[3], ("candidate", "10"));
        assert_eq!(row[5], ("solved", "true"));
    }
}
