use crate::geometry::Point;

use serde::{Deserialize, Serialize};

/// Which behavior characterization a world should record
/// during behavior trials. Selected once at configuration
/// time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BehaviorCharacterizationKind {
    /// Record only where the navigator ended up.
    EndPoint,
    /// Record the navigator's position at every timestep.
    Trajectory,
}

/// A strategy object summarizing one trial's movement
/// into a fixed-shape descriptor: either the final
/// position, or the full visited trajectory.
///
/// The world updates the characterization with the start
/// position before the first timestep, so the descriptor
/// is never empty: a navigator that never moves still has
/// a well-defined end point.
#[derive(Clone, Debug, PartialEq)]
pub enum BehaviorCharacterization {
    EndPoint(Option<Point>),
    Trajectory(Vec<Point>),
}

impl BehaviorCharacterization {
    pub fn new(kind: BehaviorCharacterizationKind) -> BehaviorCharacterization {
        match kind {
            BehaviorCharacterizationKind::EndPoint => BehaviorCharacterization::EndPoint(None),
            BehaviorCharacterizationKind::Trajectory => {
                BehaviorCharacterization::Trajectory(Vec::new())
            }
        }
    }

    /// Records one position sample.
    pub fn update(&mut self, position: Point) {
        match self {
            BehaviorCharacterization::EndPoint(end) => *end = Some(position),
            BehaviorCharacterization::Trajectory(path) => path.push(position),
        }
    }

    /// Flattens the characterization into the behavior
    /// vector stored on a genome's evaluation record.
    pub fn into_vector(self) -> Vec<f64> {
        match self {
            BehaviorCharacterization::EndPoint(end) => {
                end.map(|p| vec![p.x, p.y]).unwrap_or_default()
            }
            BehaviorCharacterization::Trajectory(path) => {
                path.into_iter().flat_map(|p| [p.x, p.y]).collect()
            }
        }
    }
}
