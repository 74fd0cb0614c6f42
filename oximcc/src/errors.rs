use crate::GenomeId;

use std::error::Error;
use std::fmt;

/// An error type indicating an invalid configuration
/// parameter. Raised during construction, before any
/// evolutionary state is built.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// A chance parameter was outside [0.0, 1.0].
    ProbabilityOutOfRange {
        parameter: &'static str,
        value: f64,
    },
    /// More species queues were requested than the
    /// population bound can hold.
    SpeciesExceedPopulation { species: usize, population: usize },
    /// The per-generation batch exceeds the population bound.
    BatchExceedsPopulation { batch: usize, population: usize },
}

/// An error type indicating an unusable seed population.
#[derive(Clone, Debug, PartialEq)]
pub enum SeedingError {
    /// Configuration was rejected before seeding started.
    Config(ConfigError),
    /// More seed genomes were supplied than the population bound.
    OversizedSeed { supplied: usize, bound: usize },
    /// Fewer seed genomes were supplied than required.
    InsufficientSeeds { supplied: usize, required: usize },
    /// A seed genome failed to decode to a phenome.
    DegenerateSeed { genome: GenomeId },
    /// A seed genome failed its minimal criterion during
    /// initial evaluation.
    NonViableSeed { genome: GenomeId },
}

/// An error type indicating a fatal failure during an
/// evolutionary run. Offspring failing their minimal
/// criterion are never errors; these conditions abort
/// the run.
#[derive(Clone, Debug, PartialEq)]
pub enum EvolutionError {
    /// Reproduction kept producing structurally degenerate
    /// offspring past the configured attempt bound.
    ReproductionFailed { parent: GenomeId, attempts: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProbabilityOutOfRange { parameter, value } => write!(
                f,
                "configuration parameter {} is {} but must lie in [0.0, 1.0]",
                parameter, value
            ),
            Self::SpeciesExceedPopulation {
                species,
                population,
            } => write!(
                f,
                "{} species queues cannot partition a population bounded at {}",
                species, population
            ),
            Self::BatchExceedsPopulation { batch, population } => write!(
                f,
                "batch size {} exceeds population bound {}",
                batch, population
            ),
        }
    }
}

impl fmt::Display for SeedingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => e.fmt(f),
            Self::OversizedSeed { supplied, bound } => write!(
                f,
                "{} seed genomes supplied for a population bounded at {}",
                supplied, bound
            ),
            Self::InsufficientSeeds { supplied, required } => write!(
                f,
                "{} seed genomes supplied where at least {} are required",
                supplied, required
            ),
            Self::DegenerateSeed { genome } => {
                write!(f, "seed genome {} does not decode to a phenome", genome)
            }
            Self::NonViableSeed { genome } => write!(
                f,
                "seed genome {} failed its minimal criterion at initialization",
                genome
            ),
        }
    }
}

impl fmt::Display for EvolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReproductionFailed { parent, attempts } => write!(
                f,
                "no decodable offspring of genome {} after {} attempts",
                parent, attempts
            ),
        }
    }
}

impl Error for ConfigError {}
impl Error for SeedingError {}
impl Error for EvolutionError {}

impl From<ConfigError> for SeedingError {
    fn from(e: ConfigError) -> SeedingError {
        SeedingError::Config(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_name_the_offender() {
        let e = ConfigError::ProbabilityOutOfRange {
            parameter: "sexual_reproduction_chance",
            value: 1.5,
        };
        assert!(e.to_string().contains("sexual_reproduction_chance"));
        assert!(e.to_string().contains("1.5"));

        let e = SeedingError::NonViableSeed { genome: 42 };
        assert!(e.to_string().contains("42"));
    }
}
