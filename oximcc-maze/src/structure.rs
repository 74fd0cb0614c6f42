use crate::geometry::{Point, Segment};

use serde::{Deserialize, Serialize};

/// The decoded, simulation-ready form of a maze genome:
/// wall segments in simulation coordinates (boundary
/// included), the navigator's start location, the goal
/// location, and the trial's timestep budget.
///
/// Structures are derived data, recomputed from a genome
/// by its decoder and cached per genome identity by the
/// world factory for the duration of a generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MazeStructure {
    pub walls: Vec<Segment>,
    pub start: Point,
    pub goal: Point,
    pub width: f64,
    pub height: f64,
    pub max_timesteps: usize,
}

impl MazeStructure {
    /// The maximum possible distance to the goal inside
    /// the maze rectangle, used to normalize trial fitness
    /// so that higher is better.
    pub fn max_distance(&self) -> f64 {
        (self.width.powi(2) + self.height.powi(2)).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_distance_is_the_diagonal() {
        let structure = MazeStructure {
            walls: Vec::new(),
            start: Point::new(0.0, 0.0),
            goal: Point::new(30.0, 40.0),
            width: 30.0,
            height: 40.0,
            max_timesteps: 100,
        };
        assert_eq!(structure.max_distance(), 50.0);
    }
}
