//! Concrete genome encodings for the maze-navigation
//! domain: recurrent navigator controllers and
//! wall-subdivision maze genomes, both implementing the
//! core [`Genome`] trait.
//!
//! The encodings are deliberately compact: MCC never
//! inspects them; it only asks them to reproduce, decode,
//! and carry their evaluation record.
//!
//! [`Genome`]: oximcc::Genome
mod config;
mod maze;
mod navigator;

pub use config::{MazeGeneticConfig, NavigatorGeneticConfig};
pub use maze::{MazeGenome, WallGene, WallOrientation};
pub use navigator::{NavigatorGenome, NeuronGene};

use rand::Rng;

/// A uniform sample in `[-power, power]`.
pub(crate) fn uniform<R: Rng>(rng: &mut R, power: f64) -> f64 {
    rng.gen_range(-power..=power)
}
