//! The maze-navigation trial simulation: one navigator,
//! one maze, a fixed timestep budget. Per timestep the
//! navigator's sensors are computed by ray casts against
//! the walls, its controller is activated, its
//! differential drive is updated under bounded rates, and
//! movement into a wall is cancelled. A trial ends the
//! first timestep the goal distance drops below the
//! success threshold, or when the budget runs out; there
//! is no other termination path.

use crate::behavior::{BehaviorCharacterization, BehaviorCharacterizationKind};
use crate::geometry::{Point, Segment};
use crate::networks::{NavigatorNetwork, SENSOR_COUNT};
use crate::structure::MazeStructure;

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI, TAU};
use std::sync::Arc;

/// Collision radius of the navigator body.
pub const NAVIGATOR_RADIUS: f64 = 8.0;

/// Bound on forward/backward speed, units per timestep.
pub const MAX_SPEED: f64 = 3.0;

/// Bound on angular velocity, radians per timestep.
pub const MAX_ANGULAR_VELOCITY: f64 = PI / 12.0;

/// Bound on the per-timestep change in speed.
pub const SPEED_DELTA: f64 = 1.0;

/// Bound on the per-timestep change in angular velocity.
pub const ANGULAR_DELTA: f64 = PI / 24.0;

/// Reach of the rangefinder sensors.
pub const RANGEFINDER_RANGE: f64 = 100.0;

/// Heading-relative directions of the six rangefinders.
const RANGEFINDER_ANGLES: [f64; 6] = [
    -FRAC_PI_2,
    -FRAC_PI_4,
    0.0,
    FRAC_PI_4,
    FRAC_PI_2,
    PI,
];

/// The observable result of one trial.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrialOutcome {
    /// Whether the navigator came within the success
    /// distance of the goal.
    pub goal_reached: bool,
    /// Timesteps elapsed: the step the goal was reached,
    /// or the full budget.
    pub timesteps: usize,
    /// Distance to the goal when the trial ended.
    pub final_distance: f64,
    /// `max_distance − final_distance`, clamped at zero;
    /// higher is better.
    pub fitness: f64,
    /// Where the navigator ended up.
    pub final_position: Point,
}

/// A stateless single-trial simulation world. Worlds are
/// cheap to construct (walls are shared) and safe to use
/// from many threads at once; all trial state lives on the
/// stack and in the navigator network.
#[derive(Clone, Debug)]
pub struct MazeNavigationWorld {
    walls: Arc<Vec<Segment>>,
    start: Point,
    goal: Point,
    max_timesteps: usize,
    min_success_distance: f64,
    max_distance: f64,
}

impl MazeNavigationWorld {
    pub fn new(
        walls: Arc<Vec<Segment>>,
        start: Point,
        goal: Point,
        max_timesteps: usize,
        min_success_distance: f64,
        max_distance: f64,
    ) -> MazeNavigationWorld {
        MazeNavigationWorld {
            walls,
            start,
            goal,
            max_timesteps,
            min_success_distance,
            max_distance,
        }
    }

    /// Builds a world for an ad hoc maze structure,
    /// outside the factory's cache.
    pub fn from_structure(
        structure: &MazeStructure,
        min_success_distance: f64,
    ) -> MazeNavigationWorld {
        MazeNavigationWorld::new(
            Arc::new(structure.walls.clone()),
            structure.start,
            structure.goal,
            structure.max_timesteps,
            min_success_distance,
            structure.max_distance(),
        )
    }

    /// Runs one trial and scores it by goal proximity.
    pub fn run_fitness_trial(&self, network: &mut NavigatorNetwork) -> TrialOutcome {
        self.run_trial(network, None)
    }

    /// Runs one trial recording the navigator's movement
    /// under the given characterization. The
    /// characterization receives the start position before
    /// the first step, then one sample per step.
    pub fn run_behavior_trial(
        &self,
        network: &mut NavigatorNetwork,
        kind: BehaviorCharacterizationKind,
    ) -> (TrialOutcome, Vec<f64>) {
        let mut behavior = BehaviorCharacterization::new(kind);
        let outcome = self.run_trial(network, Some(&mut behavior));
        (outcome, behavior.into_vector())
    }

    fn run_trial(
        &self,
        network: &mut NavigatorNetwork,
        mut behavior: Option<&mut BehaviorCharacterization>,
    ) -> TrialOutcome {
        network.clear_state();
        let mut position = self.start;
        let mut heading = 0.0;
        let mut speed = 0.0;
        let mut angular_velocity = 0.0;
        let mut timesteps = 0;
        let mut distance = position.distance(self.goal);

        if let Some(b) = behavior.as_deref_mut() {
            b.update(position);
        }

        if distance >= self.min_success_distance {
            for step in 1..=self.max_timesteps {
                timesteps = step;
                let inputs = self.sense(position, heading);
                network.activate(&inputs);
                let [turn, thrust] = network.outputs();

                angular_velocity = (angular_velocity + (turn - 0.5) * ANGULAR_DELTA)
                    .clamp(-MAX_ANGULAR_VELOCITY, MAX_ANGULAR_VELOCITY);
                speed = (speed + (thrust - 0.5) * SPEED_DELTA).clamp(-MAX_SPEED, MAX_SPEED);
                heading = wrap_angle(heading + angular_velocity);

                let next = Point::new(
                    position.x + heading.cos() * speed,
                    position.y + heading.sin() * speed,
                );
                if !self.collides(next) {
                    position = next;
                }

                if let Some(b) = behavior.as_deref_mut() {
                    b.update(position);
                }
                distance = position.distance(self.goal);
                if distance < self.min_success_distance {
                    break;
                }
            }
        }

        TrialOutcome {
            goal_reached: distance < self.min_success_distance,
            timesteps,
            final_distance: distance,
            fitness: (self.max_distance - distance).max(0.0),
            final_position: position,
        }
    }

    /// Computes the sensor vector for a pose: six
    /// normalized rangefinder readings followed by four
    /// goal-radar slices (exactly one is hot).
    fn sense(&self, position: Point, heading: f64) -> [f64; SENSOR_COUNT] {
        let mut inputs = [0.0; SENSOR_COUNT];
        for (i, offset) in RANGEFINDER_ANGLES.iter().enumerate() {
            inputs[i] = self.rangefinder(position, heading + offset) / RANGEFINDER_RANGE;
        }

        let to_goal = (self.goal.y - position.y).atan2(self.goal.x - position.x);
        let relative = wrap_angle(to_goal - heading);
        let slice = if (-FRAC_PI_4..FRAC_PI_4).contains(&relative) {
            0
        } else if (FRAC_PI_4..3.0 * FRAC_PI_4).contains(&relative) {
            1
        } else if (-3.0 * FRAC_PI_4..-FRAC_PI_4).contains(&relative) {
            3
        } else {
            2
        };
        inputs[6 + slice] = 1.0;
        inputs
    }

    /// Distance to the nearest wall along a direction,
    /// capped at the rangefinder reach.
    fn rangefinder(&self, position: Point, angle: f64) -> f64 {
        let ray = Segment::new(
            position,
            Point::new(
                position.x + angle.cos() * RANGEFINDER_RANGE,
                position.y + angle.sin() * RANGEFINDER_RANGE,
            ),
        );
        self.walls
            .iter()
            .filter_map(|wall| ray.intersection(wall))
            .map(|hit| position.distance(hit))
            .fold(RANGEFINDER_RANGE, f64::min)
    }

    fn collides(&self, position: Point) -> bool {
        self.walls
            .iter()
            .any(|wall| wall.distance_to_point(position) < NAVIGATOR_RADIUS)
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn goal(&self) -> Point {
        self.goal
    }

    pub fn max_timesteps(&self) -> usize {
        self.max_timesteps
    }

    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    pub fn min_success_distance(&self) -> f64 {
        self.min_success_distance
    }
}

fn wrap_angle(angle: f64) -> f64 {
    let mut wrapped = angle % TAU;
    if wrapped > PI {
        wrapped -= TAU;
    } else if wrapped < -PI {
        wrapped += TAU;
    }
    wrapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::{NavigatorGenome, NeuronGene};
    use crate::networks::OUTPUT_COUNT;

    fn zero_neuron() -> NeuronGene {
        NeuronGene {
            input_weights: [0.0; SENSOR_COUNT + 1],
            recurrent_weight: 0.0,
            output_weights: [0.0; OUTPUT_COUNT],
        }
    }

    /// A controller that never turns and always thrusts:
    /// it drives straight along its initial heading.
    fn straight_runner() -> NavigatorNetwork {
        let genome = NavigatorGenome::new(0, 0, vec![zero_neuron()], [0.0, 6.0]);
        NavigatorNetwork::from(&genome)
    }

    /// A controller with centered outputs: zero speed
    /// delta, so it never leaves the start.
    fn idler() -> NavigatorNetwork {
        let genome = NavigatorGenome::new(0, 0, vec![zero_neuron()], [0.0, 0.0]);
        NavigatorNetwork::from(&genome)
    }

    fn open_world(start: Point, goal: Point, max_timesteps: usize) -> MazeNavigationWorld {
        MazeNavigationWorld::new(
            Arc::new(Vec::new()),
            start,
            goal,
            max_timesteps,
            5.0,
            300.0,
        )
    }

    #[test]
    fn starting_at_the_goal_succeeds_in_zero_timesteps() {
        let world = open_world(Point::new(100.0, 100.0), Point::new(100.0, 100.0), 400);
        let outcome = world.run_fitness_trial(&mut straight_runner());
        assert!(outcome.goal_reached);
        assert_eq!(outcome.timesteps, 0);
        assert_eq!(outcome.final_distance, 0.0);
    }

    #[test]
    fn straight_runner_reaches_an_aligned_goal() {
        let world = open_world(Point::new(5.0, 50.0), Point::new(295.0, 50.0), 400);
        let outcome = world.run_fitness_trial(&mut straight_runner());
        assert!(outcome.goal_reached);
        assert!(outcome.timesteps < 400);
        // Fitness lands close to max_distance − success distance.
        assert!(outcome.fitness > 300.0 - 5.0 - MAX_SPEED);
    }

    #[test]
    fn unreachable_goal_exhausts_the_budget() {
        // A box of walls around the start leaves the goal
        // unreachable.
        let walls = vec![
            Segment::new(Point::new(20.0, 20.0), Point::new(80.0, 20.0)),
            Segment::new(Point::new(80.0, 20.0), Point::new(80.0, 80.0)),
            Segment::new(Point::new(80.0, 80.0), Point::new(20.0, 80.0)),
            Segment::new(Point::new(20.0, 80.0), Point::new(20.0, 20.0)),
        ];
        let world = MazeNavigationWorld::new(
            Arc::new(walls),
            Point::new(50.0, 50.0),
            Point::new(200.0, 50.0),
            150,
            5.0,
            300.0,
        );
        let outcome = world.run_fitness_trial(&mut straight_runner());
        assert!(!outcome.goal_reached);
        assert_eq!(outcome.timesteps, 150);
        assert!(outcome.final_distance >= 200.0 - 50.0 - 30.0);
    }

    #[test]
    fn idle_navigator_stays_at_the_start() {
        let world = open_world(Point::new(40.0, 40.0), Point::new(200.0, 200.0), 50);
        let outcome = world.run_fitness_trial(&mut idler());
        assert!(!outcome.goal_reached);
        assert_eq!(outcome.final_position, Point::new(40.0, 40.0));
    }

    #[test]
    fn walls_block_movement() {
        let wall = Segment::new(Point::new(30.0, 0.0), Point::new(30.0, 100.0));
        let world = MazeNavigationWorld::new(
            Arc::new(vec![wall]),
            Point::new(5.0, 50.0),
            Point::new(95.0, 50.0),
            200,
            5.0,
            150.0,
        );
        let outcome = world.run_fitness_trial(&mut straight_runner());
        assert!(!outcome.goal_reached);
        // The navigator piles up against the wall at its
        // collision radius.
        assert!(outcome.final_position.x <= 30.0 - NAVIGATOR_RADIUS);
        assert!(outcome.final_position.x > 5.0);
    }

    #[test]
    fn behavior_trial_records_the_trajectory() {
        let world = open_world(Point::new(5.0, 50.0), Point::new(295.0, 50.0), 400);
        let (outcome, trajectory) = world.run_behavior_trial(
            &mut straight_runner(),
            BehaviorCharacterizationKind::Trajectory,
        );
        assert!(outcome.goal_reached);
        // Start sample plus one per elapsed timestep.
        assert_eq!(trajectory.len(), 2 * (outcome.timesteps + 1));

        let (_, end_point) = world.run_behavior_trial(
            &mut straight_runner(),
            BehaviorCharacterizationKind::EndPoint,
        );
        assert_eq!(end_point.len(), 2);
        assert_eq!(&trajectory[trajectory.len() - 2..], &end_point[..]);
    }

    #[test]
    fn rangefinders_see_walls_and_radar_sees_the_goal() {
        let wall = Segment::new(Point::new(60.0, 0.0), Point::new(60.0, 100.0));
        let world = MazeNavigationWorld::new(
            Arc::new(vec![wall]),
            Point::new(20.0, 50.0),
            Point::new(90.0, 50.0),
            100,
            5.0,
            120.0,
        );
        let inputs = world.sense(Point::new(20.0, 50.0), 0.0);
        // Forward rangefinder hits the wall at 40 units.
        assert!((inputs[2] - 0.4).abs() < 1e-9);
        // Sideways and backward rays see nothing.
        assert_eq!(inputs[0], 1.0);
        assert_eq!(inputs[4], 1.0);
        assert_eq!(inputs[5], 1.0);
        // The goal lies dead ahead: slice 0 is hot.
        assert_eq!(&inputs[6..], &[1.0, 0.0, 0.0, 0.0]);

        // Turn the navigator around; the goal moves to the
        // rear slice.
        let inputs = world.sense(Point::new(20.0, 50.0), PI);
        assert_eq!(&inputs[6..], &[0.0, 0.0, 1.0, 0.0]);
    }
}
