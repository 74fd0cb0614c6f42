use crate::control::{RunControl, RunState};
use crate::errors::{EvolutionError, SeedingError};
use crate::evaluation::{EvaluationCounter, MccEvaluator};
use crate::genome::Genome;
use crate::queueing::{GenerationReport, QueueingEa};

use serde::{Deserialize, Serialize};

use std::num::{NonZeroU64, NonZeroUsize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Condvar, Mutex};

/// Which of the container's two populations a status or
/// report refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Agents,
    Environments,
}

/// Stop conditions for a coevolutionary run. Budgets are
/// expressed in generations and evaluations only; there
/// are no wall-clock deadlines anywhere in the loop.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MccConfig {
    /// Generations each population may complete. `None`
    /// runs until terminated externally.
    pub max_generations: Option<NonZeroUsize>,
    /// Bound on the run-wide shared trial counter.
    pub max_evaluations: Option<NonZeroU64>,
}

impl MccConfig {
    /// A configuration with no stop conditions.
    pub const fn unbounded() -> MccConfig {
        MccConfig {
            max_generations: None,
            max_evaluations: None,
        }
    }
}

/// Lock-free counters describing one population's
/// progress. Safe to read from any thread while the run
/// is in flight; status pollers must never block the
/// generation loops.
#[derive(Debug, Default)]
pub struct SideStatus {
    generation: AtomicUsize,
    evaluations: AtomicU64,
    population_size: AtomicUsize,
}

impl SideStatus {
    pub fn generation(&self) -> usize {
        self.generation.load(Ordering::Relaxed)
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations.load(Ordering::Relaxed)
    }

    pub fn population_size(&self) -> usize {
        self.population_size.load(Ordering::Relaxed)
    }

    fn record(&self, report: &GenerationReport) {
        self.generation.store(report.generation, Ordering::Relaxed);
        self.evaluations.store(report.evaluations, Ordering::Relaxed);
        self.population_size
            .store(report.population_size, Ordering::Relaxed);
    }
}

/// Shared observation point for a coevolutionary run:
/// per-side progress counters plus the run-state of both
/// generation loops. State changes go through a condition
/// variable, so waiting for quiescence does not poll.
#[derive(Debug)]
pub struct StatusBoard {
    agents: SideStatus,
    environments: SideStatus,
    states: Mutex<[RunState; 2]>,
    changed: Condvar,
}

impl StatusBoard {
    fn new() -> StatusBoard {
        StatusBoard {
            agents: SideStatus::default(),
            environments: SideStatus::default(),
            states: Mutex::new([RunState::Ready; 2]),
            changed: Condvar::new(),
        }
    }

    pub fn side(&self, side: Side) -> &SideStatus {
        match side {
            Side::Agents => &self.agents,
            Side::Environments => &self.environments,
        }
    }

    pub fn state_of(&self, side: Side) -> RunState {
        let states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        states[side_index(side)]
    }

    /// The container's state mirrors the union of both
    /// loops: `Terminated` only when both have terminated,
    /// `Paused` only when both are at rest, `Running` if
    /// either loop is still advancing.
    pub fn container_state(&self) -> RunState {
        let states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        if states.iter().all(|s| *s == RunState::Terminated) {
            RunState::Terminated
        } else if states
            .iter()
            .all(|s| matches!(*s, RunState::Paused | RunState::Terminated))
        {
            RunState::Paused
        } else if states.iter().any(|s| *s == RunState::Running) {
            RunState::Running
        } else {
            RunState::Ready
        }
    }

    /// Blocks until both generation loops are paused or
    /// terminated. Combined with [`RunControl::request_pause`],
    /// this is the "pause and wait" operation.
    ///
    /// [`RunControl::request_pause`]: crate::RunControl::request_pause
    pub fn wait_until_quiescent(&self) {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        while !states
            .iter()
            .all(|s| matches!(*s, RunState::Paused | RunState::Terminated))
        {
            states = self
                .changed
                .wait(states)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    fn set_state(&self, side: Side, state: RunState) {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        states[side_index(side)] = state;
        self.changed.notify_all();
    }
}

fn side_index(side: Side) -> usize {
    match side {
        Side::Agents => 0,
        Side::Environments => 1,
    }
}

/// Counters summarizing a finished run.
#[derive(Clone, Copy, Debug)]
pub struct RunSummary {
    pub agent_generations: usize,
    pub environment_generations: usize,
    pub evaluations: u64,
}

/// The MCC container: two queueing EAs coupled so that
/// each one's minimal-criterion evaluator always judges
/// offspring against a recent snapshot of the *other*
/// population.
///
/// Construction performs the initial cross-wiring (each
/// evaluator receives the opposing seed population) and
/// evaluates both seed populations; a seed that fails its
/// criterion is a fatal error, since coevolution cannot
/// start from a population that does not satisfy its own
/// minimal criterion.
pub struct Mcc<GA, EA, GB, EB>
where
    GA: Genome,
    GB: Genome,
    EA: MccEvaluator<GA, Opponent = GB>,
    EB: MccEvaluator<GB, Opponent = GA>,
{
    agents: QueueingEa<GA, EA>,
    environments: QueueingEa<GB, EB>,
    config: MccConfig,
    counter: EvaluationCounter,
    status: Arc<StatusBoard>,
}

impl<GA, EA, GB, EB> Mcc<GA, EA, GB, EB>
where
    GA: Genome,
    GB: Genome,
    EA: MccEvaluator<GA, Opponent = GB>,
    EB: MccEvaluator<GB, Opponent = GA>,
{
    /// Couples two seeded EAs, cross-wires their
    /// evaluators, and evaluates both seed populations.
    ///
    /// `counter` should be the same run-wide
    /// [`EvaluationCounter`] the evaluators increment, so
    /// the `max_evaluations` stop condition sees every
    /// trial.
    pub fn new(
        mut agents: QueueingEa<GA, EA>,
        mut environments: QueueingEa<GB, EB>,
        config: MccConfig,
        counter: EvaluationCounter,
    ) -> Result<Mcc<GA, EA, GB, EB>, SeedingError> {
        let agent_snapshot = agents.snapshot();
        let environment_snapshot = environments.snapshot();
        agents.evaluator_mut().update_opponents(&environment_snapshot);
        environments.evaluator_mut().update_opponents(&agent_snapshot);
        agents.initialize()?;
        environments.initialize()?;
        Ok(Mcc {
            agents,
            environments,
            config,
            counter,
            status: Arc::new(StatusBoard::new()),
        })
    }

    pub fn agents(&self) -> &QueueingEa<GA, EA> {
        &self.agents
    }

    pub fn environments(&self) -> &QueueingEa<GB, EB> {
        &self.environments
    }

    /// Returns the shared status board for non-blocking
    /// external monitoring.
    pub fn status(&self) -> Arc<StatusBoard> {
        Arc::clone(&self.status)
    }

    pub fn agent_champion(&self) -> Option<&GA> {
        self.agents.champion()
    }

    pub fn environment_champion(&self) -> Option<&GB> {
        self.environments.champion()
    }

    fn summary(&self) -> RunSummary {
        RunSummary {
            agent_generations: self.agents.generation(),
            environment_generations: self.environments.generation(),
            evaluations: self.counter.value(),
        }
    }

    /// Runs both populations on the calling thread,
    /// strictly alternating single generations, refreshing
    /// the opposing evaluator after every tick. Given one
    /// RNG seed per EA and a fixed configuration, this
    /// driver is fully deterministic.
    ///
    /// `observer` receives every generation report; the
    /// experiment layer uses it for statistics printing and
    /// row logging.
    pub fn run_alternating<F>(
        &mut self,
        control: &RunControl,
        mut observer: F,
    ) -> Result<RunSummary, EvolutionError>
    where
        F: FnMut(Side, &GenerationReport),
    {
        self.set_both_states(RunState::Running);
        loop {
            if control.pause_requested() {
                self.set_both_states(RunState::Paused);
            }
            if !control.wait_while_paused() {
                break;
            }
            self.set_both_states(RunState::Running);

            let agent_report = self.agents.evolve_generation()?;
            self.environments
                .evaluator_mut()
                .update_opponents(&self.agents.snapshot());
            self.status.side(Side::Agents).record(&agent_report);
            observer(Side::Agents, &agent_report);

            let environment_report = self.environments.evolve_generation()?;
            self.agents
                .evaluator_mut()
                .update_opponents(&self.environments.snapshot());
            self.status
                .side(Side::Environments)
                .record(&environment_report);
            observer(Side::Environments, &environment_report);

            if budget_exhausted(&self.config, self.agents.generation(), &self.counter) {
                break;
            }
        }
        self.set_both_states(RunState::Terminated);
        Ok(self.summary())
    }

    /// Runs each population's generation loop on its own
    /// scoped thread. Population snapshots flow through
    /// channels after every generation; an evaluator
    /// always judges against the most recent snapshot it
    /// has received, which may lag the live opposing
    /// population by at most the generation in flight.
    ///
    /// Pause and terminate requests are honored at
    /// generation boundaries on both threads. If one side
    /// fails, it requests termination so the other side
    /// stops at its next boundary.
    pub fn run_parallel(&mut self, control: &RunControl) -> Result<RunSummary, EvolutionError>
    where
        GA: Send,
        GB: Send,
        EA: Send,
        EB: Send,
        GA::Config: Send,
        GB::Config: Send,
    {
        let (agent_tx, agent_rx) = mpsc::channel::<Vec<GA>>();
        let (environment_tx, environment_rx) = mpsc::channel::<Vec<GB>>();
        let status = Arc::clone(&self.status);
        let counter = self.counter.clone();
        let config = self.config.clone();
        let agents = &mut self.agents;
        let environments = &mut self.environments;

        let (first, second) = std::thread::scope(|scope| {
            let status_a = Arc::clone(&status);
            let counter_a = counter.clone();
            let config_a = config.clone();
            let agent_loop = scope.spawn(move || {
                run_side(
                    agents,
                    Side::Agents,
                    &status_a,
                    control,
                    &config_a,
                    &counter_a,
                    environment_rx,
                    agent_tx,
                )
            });
            let environment_loop = scope.spawn(move || {
                run_side(
                    environments,
                    Side::Environments,
                    &status,
                    control,
                    &config,
                    &counter,
                    agent_rx,
                    environment_tx,
                )
            });
            (
                agent_loop
                    .join()
                    .unwrap_or_else(|_| panic!("agent generation loop panicked")),
                environment_loop
                    .join()
                    .unwrap_or_else(|_| panic!("environment generation loop panicked")),
            )
        });
        first?;
        second?;
        Ok(self.summary())
    }

    fn set_both_states(&mut self, state: RunState) {
        self.status.set_state(Side::Agents, state);
        self.status.set_state(Side::Environments, state);
        self.agents.set_state(state);
        self.environments.set_state(state);
    }
}

fn budget_exhausted(config: &MccConfig, generation: usize, counter: &EvaluationCounter) -> bool {
    config
        .max_generations
        .map_or(false, |bound| generation >= bound.get())
        || config
            .max_evaluations
            .map_or(false, |bound| counter.value() >= bound.get())
}

/// One population's generation loop in the parallel
/// driver. Runs until a stop condition or termination
/// request, publishing a population snapshot after every
/// generation and adopting the latest opposing snapshot
/// before the next one.
fn run_side<G, E, O>(
    ea: &mut QueueingEa<G, E>,
    side: Side,
    status: &StatusBoard,
    control: &RunControl,
    config: &MccConfig,
    counter: &EvaluationCounter,
    incoming: mpsc::Receiver<Vec<O>>,
    outgoing: mpsc::Sender<Vec<G>>,
) -> Result<(), EvolutionError>
where
    G: Genome,
    O: Genome,
    E: MccEvaluator<G, Opponent = O>,
{
    status.set_state(side, RunState::Running);
    loop {
        if control.pause_requested() {
            status.set_state(side, RunState::Paused);
            ea.set_state(RunState::Paused);
        }
        if !control.wait_while_paused() {
            break;
        }
        status.set_state(side, RunState::Running);
        ea.set_state(RunState::Running);

        let mut latest = None;
        while let Ok(snapshot) = incoming.try_recv() {
            latest = Some(snapshot);
        }
        if let Some(snapshot) = latest {
            ea.evaluator_mut().update_opponents(&snapshot);
        }

        let report = match ea.evolve_generation() {
            Ok(report) => report,
            Err(e) => {
                control.terminate();
                status.set_state(side, RunState::Terminated);
                ea.set_state(RunState::Terminated);
                return Err(e);
            }
        };
        status.side(side).record(&report);
        // The opposing loop may already have stopped and
        // dropped its receiver; a failed send is not an error.
        let _ = outgoing.send(ea.snapshot());

        if budget_exhausted(config, ea.generation(), counter) {
            break;
        }
    }
    status.set_state(side, RunState::Terminated);
    ea.set_state(RunState::Terminated);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::populations::QueueConfig;
    use crate::test_support::{seed_genomes, CountingConfig, CountingGenome, ThresholdEvaluator};
    use crate::{Genome, IdSequence};
    use std::num::NonZeroUsize;

    type TestEa = QueueingEa<CountingGenome, ThresholdEvaluator>;

    fn queue_config(max_size: usize, batch: usize) -> QueueConfig {
        QueueConfig {
            max_size: NonZeroUsize::new(max_size).unwrap(),
            batch_size: NonZeroUsize::new(batch).unwrap(),
            species_count: NonZeroUsize::new(1).unwrap(),
            sexual_reproduction_chance: 0.0,
            max_reproduction_attempts: NonZeroUsize::new(4).unwrap(),
        }
    }

    fn test_ea(
        ids: &Arc<IdSequence>,
        size: usize,
        counter: &EvaluationCounter,
        rng_seed: u64,
    ) -> TestEa {
        let seed = seed_genomes(ids, size);
        QueueingEa::new(
            seed,
            ThresholdEvaluator::new(f64::NEG_INFINITY).counting(counter.clone()),
            queue_config(size, 2),
            CountingConfig::default(),
            Arc::clone(ids),
            rng_seed,
        )
        .unwrap()
    }

    fn test_container(
        max_generations: usize,
    ) -> Mcc<CountingGenome, ThresholdEvaluator, CountingGenome, ThresholdEvaluator> {
        let ids = Arc::new(IdSequence::default());
        let counter = EvaluationCounter::default();
        let agents = test_ea(&ids, 8, &counter, 1);
        let environments = test_ea(&ids, 6, &counter, 2);
        Mcc::new(
            agents,
            environments,
            MccConfig {
                max_generations: NonZeroUsize::new(max_generations),
                max_evaluations: None,
            },
            counter,
        )
        .unwrap()
    }

    #[test]
    fn construction_cross_wires_both_evaluators() {
        let mcc = test_container(1);
        let agent_ids: Vec<_> = mcc.agents().population().map(|g| g.id()).collect();
        let environment_ids: Vec<_> = mcc.environments().population().map(|g| g.id()).collect();
        assert_eq!(mcc.agents().evaluator().opponent_ids, environment_ids);
        assert_eq!(mcc.environments().evaluator().opponent_ids, agent_ids);
    }

    #[test]
    fn seeds_are_evaluated_at_construction() {
        let mcc = test_container(1);
        assert!(mcc
            .agents()
            .population()
            .all(|g| g.evaluation_info().is_viable));
        assert!(mcc
            .environments()
            .population()
            .all(|g| g.evaluation_info().evaluation_count > 0));
    }

    #[test]
    fn alternating_run_refreshes_opposing_evaluator() {
        let mut mcc = test_container(1);
        let control = RunControl::new();
        mcc.run_alternating(&control, |_, _| {}).unwrap();

        let agent_ids: Vec<_> = mcc.agents().population().map(|g| g.id()).collect();
        let environment_ids: Vec<_> = mcc.environments().population().map(|g| g.id()).collect();
        // Each evaluator saw the opposing population as it
        // stood after that population's latest generation.
        assert_eq!(mcc.environments().evaluator().opponent_ids, agent_ids);
        assert_eq!(mcc.agents().evaluator().opponent_ids, environment_ids);
        assert_eq!(mcc.status().container_state(), RunState::Terminated);
    }

    #[test]
    fn alternating_run_honors_generation_budget() {
        let mut mcc = test_container(5);
        let control = RunControl::new();
        let summary = mcc.run_alternating(&control, |_, _| {}).unwrap();
        assert_eq!(summary.agent_generations, 5);
        assert_eq!(summary.environment_generations, 5);
        assert_eq!(mcc.agents().population_len(), 8);
        assert_eq!(mcc.environments().population_len(), 6);
    }

    #[test]
    fn evaluation_budget_stops_the_run() {
        let ids = Arc::new(IdSequence::default());
        let counter = EvaluationCounter::default();
        let agents = test_ea(&ids, 8, &counter, 1);
        let environments = test_ea(&ids, 6, &counter, 2);
        let mut mcc = Mcc::new(
            agents,
            environments,
            MccConfig {
                max_generations: None,
                max_evaluations: NonZeroU64::new(20),
            },
            counter.clone(),
        )
        .unwrap();
        let control = RunControl::new();
        mcc.run_alternating(&control, |_, _| {}).unwrap();
        // 14 seed evaluations happen at construction; the
        // run then stops at the first boundary at or past
        // the budget.
        assert!(counter.value() >= 20);
        assert!(mcc.agents().generation() < 10);
    }

    #[test]
    fn parallel_run_reaches_generation_budget() {
        let mut mcc = test_container(3);
        let control = RunControl::new();
        let summary = mcc.run_parallel(&control).unwrap();
        assert!(summary.agent_generations >= 3);
        assert!(summary.environment_generations >= 3);
        assert_eq!(mcc.agents().population_len(), 8);
        assert_eq!(mcc.environments().population_len(), 6);
        assert_eq!(mcc.status().container_state(), RunState::Terminated);
    }

    #[test]
    fn terminate_request_stops_an_unbounded_run() {
        // NonZeroUsize::new(0) is None: no generation budget.
        let mut mcc = test_container(0);
        let control = RunControl::new();
        control.terminate();
        let summary = mcc.run_alternating(&control, |_, _| {}).unwrap();
        assert_eq!(summary.agent_generations, 0);
        assert_eq!(mcc.status().container_state(), RunState::Terminated);
    }
}
