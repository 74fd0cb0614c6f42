use oximcc::logging::{self, CsvLogger, DataLogger};
use oximcc::{
    BootstrapConfig, EvaluationCounter, Genome, IdSequence, Mcc, MccConfig, QueueConfig,
    QueueingEa, RunControl, Side,
};
use oximcc_maze::evaluators::{
    AgentNavigationEvaluator, EvaluationMode, MazeViabilityEvaluator, TRIAL_LOG_FIELDS,
};
use oximcc_maze::factory::MultiMazeWorldFactory;
use oximcc_maze::genomics::{
    MazeGenome, MazeGeneticConfig, NavigatorGenome, NavigatorGeneticConfig,
};
use oximcc_maze::seeding::{SeedEvolver, SeedEvolverConfig};

use rand::rngs::StdRng;
use rand::SeedableRng;

use std::fs::File;
use std::io::BufWriter;
use std::num::{NonZeroU64, NonZeroUsize};
use std::process::ExitCode;
use std::sync::Arc;

const RNG_SEED: u64 = 20170405;
const SEED_MAZE_COUNT: usize = 10;
const AGENT_POPULATION: usize = 250;
const MAZE_POPULATION: usize = 50;
const AGENT_BATCH: usize = 40;
const MAZE_BATCH: usize = 10;
const AGENT_SPECIES: usize = 5;
const MAZE_SPECIES: usize = 2;
const MIN_SUCCESS_DISTANCE: f64 = 15.0;
const MAZES_SOLVED_CRITERION: usize = 1;
const AGENTS_SOLVED_CRITERION: usize = 1;
const AGENTS_FAILED_CRITERION: usize = 1;
const RESOURCE_LIMIT: usize = 256;
const MAX_GENERATIONS: usize = 500;
const MAX_EVALUATIONS: u64 = 2_000_000;
const PRINT_EVERY: usize = 25;

fn navigator_config() -> NavigatorGeneticConfig {
    NavigatorGeneticConfig {
        initial_hidden_count: NonZeroUsize::new(4).unwrap(),
        max_hidden_count: NonZeroUsize::new(12).unwrap(),
        weight_bound: 5.0,
        initial_weight_power: 1.0,
        weight_reset_chance: 0.05,
        weight_nudge_chance: 0.9,
        weight_mutation_power: 0.5,
        neuron_addition_mutation_chance: 0.03,
        neuron_deletion_mutation_chance: 0.01,
        child_mutation_chance: 0.6,
        mate_by_averaging_chance: 0.4,
        common_weight_factor: 1.0,
        disparity_factor: 2.0,
        ..NavigatorGeneticConfig::zero()
    }
}

fn maze_config() -> MazeGeneticConfig {
    MazeGeneticConfig {
        width: 300.0,
        height: 300.0,
        passage_width: 30.0,
        endpoint_offset: 20.0,
        initial_wall_count: 2,
        max_wall_count: NonZeroUsize::new(12).unwrap(),
        position_mutation_chance: 0.4,
        position_mutation_power: 0.1,
        wall_addition_mutation_chance: 0.1,
        wall_deletion_mutation_chance: 0.02,
        orientation_flip_chance: 0.05,
        child_mutation_chance: 0.6,
        base_timesteps: 300,
        timesteps_per_wall: 100,
        wall_count_factor: 1.0,
        position_factor: 1.0,
        ..MazeGeneticConfig::zero()
    }
}

fn seed_evolver_config() -> SeedEvolverConfig {
    SeedEvolverConfig {
        bootstrap: BootstrapConfig {
            population_size: NonZeroUsize::new(100).unwrap(),
            elitism: 2,
            survival_threshold: 0.3,
            sexual_reproduction_chance: 0.4,
            max_reproduction_attempts: NonZeroUsize::new(16).unwrap(),
        },
        target_solver_count: NonZeroUsize::new(AGENT_POPULATION / 5).unwrap(),
        solvers_per_maze: NonZeroUsize::new(3).unwrap(),
        nonsolvers_per_maze: 2,
        evaluation_budget: NonZeroU64::new(200_000).unwrap(),
        max_restarts: 5,
        min_success_distance: MIN_SUCCESS_DISTANCE,
        mazes_solved_criterion: NonZeroUsize::new(MAZES_SOLVED_CRITERION).unwrap(),
        agents_solved_criterion: NonZeroUsize::new(AGENTS_SOLVED_CRITERION).unwrap(),
        agents_failed_criterion: AGENTS_FAILED_CRITERION,
    }
}

fn main() -> ExitCode {
    let log_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "mazenav-log.csv".to_string());
    let log_file = match File::create(&log_path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("cannot create log file {}: {}", log_path, e);
            return ExitCode::FAILURE;
        }
    };
    let mut csv = CsvLogger::new(BufWriter::new(log_file));
    csv.log_header(&TRIAL_LOG_FIELDS);
    let logger = logging::shared(csv);

    let ids = Arc::new(IdSequence::default());
    let counter = EvaluationCounter::default();
    let navigator_config = navigator_config();
    let maze_config = maze_config();

    // Seed mazes: random decodable genomes.
    let mut rng = StdRng::seed_from_u64(RNG_SEED);
    let seed_mazes: Vec<MazeGenome> = (0..SEED_MAZE_COUNT)
        .map(|_| loop {
            let genome = MazeGenome::random(ids.next_id(), 0, &maze_config, &mut rng);
            if genome.decode(&maze_config).is_some() {
                break genome;
            }
        })
        .collect();

    // Bootstrap the first viable navigator population.
    let evolver = SeedEvolver::new(
        seed_evolver_config(),
        navigator_config.clone(),
        maze_config.clone(),
        Arc::clone(&ids),
        counter.clone(),
    )
    .with_logger(Arc::clone(&logger));
    let seed = match evolver.evolve_seed_agents(&seed_mazes, RNG_SEED) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("seed evolution failed: {}", e);
            return ExitCode::FAILURE;
        }
    };
    println!(
        "seeded {} navigators in {} evaluations ({} restarts)",
        seed.agents.len(),
        seed.evaluations,
        seed.restarts
    );

    // The coupled queueing EAs.
    let agent_evaluator = AgentNavigationEvaluator::new(
        MultiMazeWorldFactory::new(maze_config.clone(), MIN_SUCCESS_DISTANCE),
        navigator_config.clone(),
        NonZeroUsize::new(MAZES_SOLVED_CRITERION).unwrap(),
        NonZeroUsize::new(RESOURCE_LIMIT),
        counter.clone(),
    )
    .with_mode(EvaluationMode::Parallel)
    .with_logger(Arc::clone(&logger));
    let maze_evaluator = MazeViabilityEvaluator::new(
        maze_config.clone(),
        navigator_config.clone(),
        MIN_SUCCESS_DISTANCE,
        NonZeroUsize::new(AGENTS_SOLVED_CRITERION).unwrap(),
        AGENTS_FAILED_CRITERION,
        counter.clone(),
    )
    .with_mode(EvaluationMode::Parallel)
    .with_logger(Arc::clone(&logger));

    let agents = match QueueingEa::new(
        seed.agents,
        agent_evaluator,
        QueueConfig {
            max_size: NonZeroUsize::new(AGENT_POPULATION).unwrap(),
            batch_size: NonZeroUsize::new(AGENT_BATCH).unwrap(),
            species_count: NonZeroUsize::new(AGENT_SPECIES).unwrap(),
            sexual_reproduction_chance: 0.3,
            max_reproduction_attempts: NonZeroUsize::new(16).unwrap(),
        },
        navigator_config.clone(),
        Arc::clone(&ids),
        RNG_SEED.wrapping_add(1),
    ) {
        Ok(ea) => ea,
        Err(e) => {
            eprintln!("agent population rejected: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let environments = match QueueingEa::new(
        seed_mazes,
        maze_evaluator,
        QueueConfig {
            max_size: NonZeroUsize::new(MAZE_POPULATION).unwrap(),
            batch_size: NonZeroUsize::new(MAZE_BATCH).unwrap(),
            species_count: NonZeroUsize::new(MAZE_SPECIES).unwrap(),
            sexual_reproduction_chance: 0.3,
            max_reproduction_attempts: NonZeroUsize::new(16).unwrap(),
        },
        maze_config.clone(),
        Arc::clone(&ids),
        RNG_SEED.wrapping_add(2),
    ) {
        Ok(ea) => ea,
        Err(e) => {
            eprintln!("maze population rejected: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut mcc = match Mcc::new(
        agents,
        environments,
        MccConfig {
            max_generations: NonZeroUsize::new(MAX_GENERATIONS),
            max_evaluations: NonZeroU64::new(MAX_EVALUATIONS),
        },
        counter.clone(),
    ) {
        Ok(mcc) => mcc,
        Err(e) => {
            eprintln!("coevolution setup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let control = RunControl::new();
    let outcome = mcc.run_alternating(&control, |side, report| {
        if report.generation % PRINT_EVERY != 0 {
            return;
        }
        let label = match side {
            Side::Agents => "agents",
            Side::Environments => "mazes ",
        };
        println!(
            "gen {:>4} [{}] accepted {:>2}/{:<2} population {:>3} evaluations {:>8} complexity {}",
            report.generation,
            label,
            report.accepted,
            report.batch_size,
            report.population_size,
            report.evaluations,
            report.complexity,
        );
    });
    let summary = match outcome {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("coevolution aborted: {}", e);
            return ExitCode::FAILURE;
        }
    };
    println!(
        "finished: {} agent generations, {} maze generations, {} evaluations",
        summary.agent_generations, summary.environment_generations, summary.evaluations
    );

    if let (Some(agent), Some(maze)) = (mcc.agent_champion(), mcc.environment_champion()) {
        match (ron::to_string(agent), ron::to_string(maze)) {
            (Ok(agent_ron), Ok(maze_ron)) => {
                println!("champion navigator: {}", agent_ron);
                println!("champion maze: {}", maze_ron);
            }
            (Err(e), _) | (_, Err(e)) => eprintln!("champion serialization failed: {}", e),
        }
    }

    logger
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .close();
    println!("trial log written to {}", log_path);
    ExitCode::SUCCESS
}
