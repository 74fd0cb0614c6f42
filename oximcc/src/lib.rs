//! An implementation of Minimal Criteria Coevolution (MCC),
//! following Brant & Stanley's 2017 paper "Minimal Criterion
//! Coevolution: A New Approach to Open-Ended Search".
//!
//! Two populations (agents and the environments they are
//! evaluated in) evolve concurrently, each one's survival
//! criterion defined relative to the other. There is no
//! scalar fitness ranking anywhere in the selection path:
//! an offspring either satisfies its minimal criterion
//! against the opposing population and enters its
//! population queue (retiring the queue's oldest member),
//! or it is discarded.
//!
//! The crate is generic over the genetic encoding via the
//! [`Genome`] trait, and over the evaluation substrate via
//! the [`MccEvaluator`] trait. A maze-navigation
//! implementation of both, navigator networks evolving
//! against maze structures, is supplied by the
//! `oximcc-maze` crate, and wired into a full experiment
//! by the `mazenav` binary.
//!
//! The pieces, leaf to root:
//!
//! - [`Genome`], [`IdSequence`], [`EvaluationInfo`]: the
//!   encoding-agnostic genome surface.
//! - [`SpeciesQueue`]: bounded FIFO population queues
//!   with age-based eviction.
//! - [`QueueingEa`]: the steady-state engine advancing
//!   one population by a batch of offspring per tick.
//! - [`Mcc`]: the container coupling two queueing EAs,
//!   with an alternating (deterministic) driver and a
//!   two-thread parallel driver.
//! - [`FitnessEa`], [`SeedOutcome`]: the generational EA
//!   used to bootstrap the first viable seed population.
//! - [`logging`]: row-oriented structured logging and
//!   population statistics.
//!
//! This crate was implemented as both a learning exercise
//! and a tool for my own experimentation. Critiques and
//! contributions are welcome.

mod bootstrap;
mod control;
mod errors;
mod evaluation;
mod genome;
pub mod logging;
mod mcc;
mod populations;
mod queueing;

#[cfg(test)]
pub(crate) mod test_support;

pub use bootstrap::*;
pub use control::*;
pub use errors::*;
pub use evaluation::*;
pub use genome::*;
pub use mcc::*;
pub use populations::{QueueConfig, SpeciesQueue};
pub use queueing::*;
