use rand::Rng;
use serde::{Deserialize, Serialize};

use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier type used to designate genomes.
/// Identifiers are unique and strictly increasing
/// across an entire run, in both populations.
pub type GenomeId = u64;

/// A monotonic source of genome identifiers,
/// shared by every genome-producing component
/// of a run (both coevolving populations and
/// the bootstrap evolver).
///
/// # Examples
/// ```
/// use oximcc::IdSequence;
///
/// let ids = IdSequence::default();
/// assert_eq!(ids.next_id(), 0);
/// assert_eq!(ids.next_id(), 1);
/// ```
#[derive(Debug, Default)]
pub struct IdSequence(AtomicU64);

impl IdSequence {
    /// Creates a sequence whose first returned identifier
    /// will be `next`.
    pub fn starting_at(next: GenomeId) -> IdSequence {
        IdSequence(AtomicU64::new(next))
    }

    /// Returns the next identifier and advances the sequence.
    pub fn next_id(&self) -> GenomeId {
        self.0.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the identifier the next call to [`next_id`]
    /// would yield, without advancing the sequence.
    ///
    /// [`next_id`]: IdSequence::next_id
    pub fn peek(&self) -> GenomeId {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-genome evaluation record, written by
/// minimal-criterion evaluators and read by the
/// queueing EA's acceptance logic.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationInfo {
    /// Best objective value observed across the genome's
    /// trials. MCC does not select on this; it is kept
    /// for logging and champion reporting.
    pub fitness: f64,
    /// Whether the genome satisfied its minimal criterion
    /// during its most recent evaluation.
    pub is_viable: bool,
    /// Number of trials the genome has participated in.
    pub evaluation_count: usize,
    /// Behavior characterization of the genome's most
    /// recent trial, if one was recorded.
    pub behavior: Vec<f64>,
}

/// An interface for genomes that can take part in
/// minimal-criteria coevolution.
///
/// The genetic encoding itself is opaque to the
/// algorithms in this crate: they only create offspring
/// through [`spawn`]/[`mate`], decode genomes to
/// phenomes for evaluation, and consult the cached
/// [`EvaluationInfo`].
///
/// [`spawn`]: Genome::spawn
/// [`mate`]: Genome::mate
pub trait Genome: Clone {
    type Config;
    type Phenome;

    /// Returns a randomized genome.
    fn random<R: Rng>(
        id: GenomeId,
        birth_generation: usize,
        config: &Self::Config,
        rng: &mut R,
    ) -> Self;

    /// Returns a mutated offspring of this genome.
    fn spawn<R: Rng>(
        &self,
        id: GenomeId,
        birth_generation: usize,
        config: &Self::Config,
        rng: &mut R,
    ) -> Self;

    /// Combines two genomes and returns a "child" genome.
    fn mate<R: Rng>(
        first: &Self,
        second: &Self,
        id: GenomeId,
        birth_generation: usize,
        config: &Self::Config,
        rng: &mut R,
    ) -> Self;

    /// Returns the genetic distance between two genomes.
    fn genetic_distance(first: &Self, second: &Self, config: &Self::Config) -> f64;

    /// Decodes the genome into its simulation-ready phenome.
    ///
    /// Returns `None` for structurally degenerate genomes;
    /// reproduction retries on such offspring rather than
    /// admitting them to a population.
    fn decode(&self, config: &Self::Config) -> Option<Self::Phenome>;

    /// Returns the genome's unique identifier.
    fn id(&self) -> GenomeId;

    /// Returns the generation in which the genome was created.
    fn birth_generation(&self) -> usize;

    /// Returns a scalar measure of structural complexity.
    fn complexity(&self) -> f64;

    /// Returns the genome's evaluation record.
    fn evaluation_info(&self) -> &EvaluationInfo;

    /// Returns the genome's evaluation record for mutation.
    /// Only evaluators should write through this.
    fn evaluation_info_mut(&mut self) -> &mut EvaluationInfo;
}
