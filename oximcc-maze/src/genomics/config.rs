use serde::{Deserialize, Serialize};

use std::num::NonZeroUsize;

/// Configuration data for navigator genome generation
/// and inter-genome operations.
///
/// # Note
/// All quantities expressing probabilities
/// should be in the range [0.0, 1.0]. Using
/// values that are not in this bound may result
/// in odd behaviours and/or incorrect programs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NavigatorGeneticConfig {
    /// Hidden units in a fresh random genome.
    pub initial_hidden_count: NonZeroUsize,
    /// Bound on hidden-layer growth through mutation.
    pub max_hidden_count: NonZeroUsize,
    /// Maximum magnitude of any weight.
    pub weight_bound: f64,
    /// Magnitude of the uniform distribution initial
    /// weights are drawn from.
    pub initial_weight_power: f64,
    /// Chance of a weight being reset during mutation.
    pub weight_reset_chance: f64,
    /// Chance of a weight being nudged during mutation,
    /// if not reset.
    pub weight_nudge_chance: f64,
    /// Magnitude of bound on weight mutation uniform
    /// distribution. It is assumed to be lesser than
    /// [`weight_bound`].
    ///
    /// [`weight_bound`]: NavigatorGeneticConfig::weight_bound
    pub weight_mutation_power: f64,
    /// Chance of a hidden-unit addition mutation.
    pub neuron_addition_mutation_chance: f64,
    /// Chance of a hidden-unit deletion mutation. A
    /// deletion may empty the hidden layer, leaving the
    /// genome undecodable.
    pub neuron_deletion_mutation_chance: f64,
    /// Chance of child mutation during mating.
    pub child_mutation_chance: f64,
    /// Chance that weights are averaged during mating,
    /// instead of copied from a randomly chosen parent.
    pub mate_by_averaging_chance: f64,
    /// Weight of the mean aligned-weight difference in
    /// genetic distance.
    pub common_weight_factor: f64,
    /// Weight of the hidden-layer size difference in
    /// genetic distance.
    pub disparity_factor: f64,
}

impl NavigatorGeneticConfig {
    /// Returns a "zero-valued" default configuration.
    /// All values are 0, empty, or in the case of
    /// `NonZeroUsize`s, 1.
    ///
    /// # Note
    /// This value is not suitable for use in most experiments.
    /// It is meant as a way to fill in unused values during
    /// configuration instantiation.
    ///
    /// # Examples
    /// ```
    /// use oximcc_maze::genomics::NavigatorGeneticConfig;
    ///
    /// let cfg = NavigatorGeneticConfig {
    ///     weight_bound: 5.0,
    ///     initial_weight_power: 1.0,
    ///     ..NavigatorGeneticConfig::zero()
    /// };
    /// ```
    pub const fn zero() -> NavigatorGeneticConfig {
        NavigatorGeneticConfig {
            // SAFETY: 1 is a valid NonZeroUsize. Replace this with
            // NonZeroUsize::new(1).unwrap() once const Option::unwrap
            // becomes stable.
            initial_hidden_count: unsafe { NonZeroUsize::new_unchecked(1) },
            max_hidden_count: unsafe { NonZeroUsize::new_unchecked(1) },
            weight_bound: 0.0,
            initial_weight_power: 0.0,
            weight_reset_chance: 0.0,
            weight_nudge_chance: 0.0,
            weight_mutation_power: 0.0,
            neuron_addition_mutation_chance: 0.0,
            neuron_deletion_mutation_chance: 0.0,
            child_mutation_chance: 0.0,
            mate_by_averaging_chance: 0.0,
            common_weight_factor: 0.0,
            disparity_factor: 0.0,
        }
    }
}

/// Configuration data for maze genome generation,
/// decoding, and inter-genome operations.
///
/// # Note
/// All quantities expressing probabilities
/// should be in the range [0.0, 1.0]. Using
/// values that are not in this bound may result
/// in odd behaviours and/or incorrect programs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MazeGeneticConfig {
    /// Maze width in simulation units.
    pub width: f64,
    /// Maze height in simulation units.
    pub height: f64,
    /// Width of the passage gap left in every wall. Must
    /// comfortably exceed the navigator's diameter for
    /// mazes to stay traversable.
    pub passage_width: f64,
    /// Inset of the start point from the top-left corner
    /// and of the goal point from the bottom-right corner.
    /// Decoding fails if a wall encroaches on either
    /// point, so this should exceed the navigator radius.
    pub endpoint_offset: f64,
    /// Wall genes in a fresh random genome.
    pub initial_wall_count: usize,
    /// Bound on wall-list growth through mutation and
    /// mating.
    pub max_wall_count: NonZeroUsize,
    /// Chance of nudging each relative position during
    /// mutation.
    pub position_mutation_chance: f64,
    /// Magnitude of bound on position mutation uniform
    /// distribution, in relative units.
    pub position_mutation_power: f64,
    /// Chance of a wall-gene addition mutation.
    pub wall_addition_mutation_chance: f64,
    /// Chance of a wall-gene deletion mutation.
    pub wall_deletion_mutation_chance: f64,
    /// Chance of flipping a wall gene's orientation.
    pub orientation_flip_chance: f64,
    /// Chance of child mutation during mating.
    pub child_mutation_chance: f64,
    /// Trial timestep budget for a maze with no walls.
    pub base_timesteps: usize,
    /// Additional timestep budget per expressed wall, so
    /// harder mazes allow longer trials.
    pub timesteps_per_wall: usize,
    /// Weight of the wall-count difference in genetic
    /// distance.
    pub wall_count_factor: f64,
    /// Weight of the mean aligned-gene difference in
    /// genetic distance.
    pub position_factor: f64,
}

impl MazeGeneticConfig {
    /// Returns a "zero-valued" default configuration.
    /// All values are 0, empty, or in the case of
    /// `NonZeroUsize`s, 1.
    ///
    /// # Note
    /// This value is not suitable for use in most experiments
    /// (a zero-sized maze cannot even host its endpoints).
    /// It is meant as a way to fill in unused values during
    /// configuration instantiation.
    pub const fn zero() -> MazeGeneticConfig {
        MazeGeneticConfig {
            width: 0.0,
            height: 0.0,
            passage_width: 0.0,
            endpoint_offset: 0.0,
            initial_wall_count: 0,
            // SAFETY: 1 is a valid NonZeroUsize. Replace this with
            // NonZeroUsize::new(1).unwrap() once const Option::unwrap
            // becomes stable.
            max_wall_count: unsafe { NonZeroUsize::new_unchecked(1) },
            position_mutation_chance: 0.0,
            position_mutation_power: 0.0,
            wall_addition_mutation_chance: 0.0,
            wall_deletion_mutation_chance: 0.0,
            orientation_flip_chance: 0.0,
            child_mutation_chance: 0.0,
            base_timesteps: 0,
            timesteps_per_wall: 0,
            wall_count_factor: 0.0,
            position_factor: 0.0,
        }
    }
}
