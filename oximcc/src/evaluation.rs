use crate::Genome;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The minimal-criterion evaluation interface coupling
/// a population to its opposing population.
///
/// Implementations run one candidate against a batch of
/// opposing phenomes, decide viability, and record the
/// verdict in the candidate's [`EvaluationInfo`]. Failing
/// the criterion is an expected outcome, never an error.
///
/// [`EvaluationInfo`]: crate::EvaluationInfo
pub trait MccEvaluator<G: Genome> {
    /// The genome type of the opposing population.
    type Opponent: Genome;

    /// Replaces the evaluator's view of the opposing
    /// population. Called by the MCC container before a
    /// generation's evaluations run, so that every verdict
    /// reflects a recent snapshot of the opposition.
    fn update_opponents(&mut self, opponents: &[Self::Opponent]);

    /// Evaluates a batch of offspring, setting `is_viable`
    /// on every member's evaluation record.
    fn evaluate_batch(&mut self, offspring: &mut [G], generation: usize);

    /// Returns the number of trials this evaluator has run.
    fn evaluation_count(&self) -> u64;

    /// Discards all internal evaluator state (phenome
    /// caches, usage counters), allowing reinitialization.
    fn reset(&mut self);
}

/// A cloneable handle over a run-wide trial counter.
///
/// Both populations' evaluators share one counter, so
/// `value()` reflects every trial run anywhere in the
/// coevolutionary system. Increments are atomic; many
/// evaluation workers bump it concurrently.
///
/// # Examples
/// ```
/// use oximcc::EvaluationCounter;
///
/// let counter = EvaluationCounter::default();
/// let same_counter = counter.clone();
/// counter.increment();
/// same_counter.increment();
/// assert_eq!(counter.value(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct EvaluationCounter(Arc<AtomicU64>);

impl EvaluationCounter {
    /// Records one trial and returns the new total.
    pub fn increment(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Returns the number of trials recorded so far.
    pub fn value(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}
