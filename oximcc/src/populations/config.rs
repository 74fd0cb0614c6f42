use crate::errors::ConfigError;

use serde::{Deserialize, Serialize};

use std::num::NonZeroUsize;

/// Configuration data for a queueing evolutionary
/// algorithm and its population.
///
/// # Note
/// All quantities expressing probabilities should be in
/// the range [0.0, 1.0]; construction through
/// [`QueueingEa::new`] rejects values outside it.
///
/// [`QueueingEa::new`]: crate::QueueingEa::new
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Bound on the population size. The population never
    /// exceeds it after a generation completes.
    pub max_size: NonZeroUsize,
    /// Number of offspring produced per generation tick.
    pub batch_size: NonZeroUsize,
    /// Number of species queues the population is
    /// pre-clustered into. 1 yields a single flat queue.
    pub species_count: NonZeroUsize,
    /// Chance that offspring will be the result of sexual
    /// reproduction (as opposed to asexual).
    pub sexual_reproduction_chance: f64,
    /// Maximum attempts to produce a structurally
    /// decodable offspring from one parent selection
    /// before the run aborts.
    pub max_reproduction_attempts: NonZeroUsize,
}

impl QueueConfig {
    /// Returns a "zero-valued" default configuration.
    /// All values are 0, or in the case of
    /// `NonZeroUsize`s, 1.
    ///
    /// # Note
    /// This value is not suitable for use in most
    /// experiments. It is meant as a way to abbreviate
    /// configuration instantiation.
    ///
    /// # Examples
    /// ```
    /// use oximcc::QueueConfig;
    /// use std::num::NonZeroUsize;
    ///
    /// let cfg = QueueConfig {
    ///     max_size: NonZeroUsize::new(250).unwrap(),
    ///     batch_size: NonZeroUsize::new(40).unwrap(),
    ///     ..QueueConfig::zero()
    /// };
    /// ```
    pub const fn zero() -> QueueConfig {
        QueueConfig {
            // SAFETY: 1 is a valid NonZeroUsize. Replace this with
            // NonZeroUsize::new(1).unwrap() once const Option::unwrap
            // becomes stable.
            max_size: unsafe { NonZeroUsize::new_unchecked(1) },
            batch_size: unsafe { NonZeroUsize::new_unchecked(1) },
            species_count: unsafe { NonZeroUsize::new_unchecked(1) },
            sexual_reproduction_chance: 0.0,
            max_reproduction_attempts: unsafe { NonZeroUsize::new_unchecked(1) },
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.sexual_reproduction_chance) {
            return Err(ConfigError::ProbabilityOutOfRange {
                parameter: "sexual_reproduction_chance",
                value: self.sexual_reproduction_chance,
            });
        }
        if self.species_count.get() > self.max_size.get() {
            return Err(ConfigError::SpeciesExceedPopulation {
                species: self.species_count.get(),
                population: self.max_size.get(),
            });
        }
        if self.batch_size.get() > self.max_size.get() {
            return Err(ConfigError::BatchExceedsPopulation {
                batch: self.batch_size.get(),
                population: self.max_size.get(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_config_is_valid() {
        assert!(QueueConfig::zero().validate().is_ok());
    }

    #[test]
    fn out_of_range_probability_is_rejected() {
        let config = QueueConfig {
            sexual_reproduction_chance: -0.1,
            ..QueueConfig::zero()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ProbabilityOutOfRange { .. })
        ));
    }

    #[test]
    fn species_beyond_population_are_rejected() {
        let config = QueueConfig {
            species_count: NonZeroUsize::new(5).unwrap(),
            max_size: NonZeroUsize::new(4).unwrap(),
            batch_size: NonZeroUsize::new(1).unwrap(),
            ..QueueConfig::zero()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SpeciesExceedPopulation { .. })
        ));
    }
}
