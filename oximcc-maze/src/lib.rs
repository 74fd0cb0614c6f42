//! # OxiMCC-Maze
//! The maze-navigation substrate for the [`OxiMCC` crate](../oximcc/index.html)'s
//! minimal-criteria coevolution: navigator controllers evolving against
//! maze structures.
//!
//! Provides:
//! - [`genomics`]: a [`NavigatorGenome`] (recurrent controller) and a
//!   [`MazeGenome`] (wall-subdivision maze), both implementing the core
//!   `Genome` trait.
//! - [`world`]: the trial simulation (ray-cast sensors, differential-drive
//!   kinematics, wall collisions, goal-distance termination).
//! - [`factory`]: the multi-maze world factory caching decoded mazes per
//!   genome identity, with per-maze success accounting.
//! - [`evaluators`]: the agent-side and maze-side minimal-criterion
//!   evaluators, parallel or sequential.
//! - [`seeding`]: bootstrap evolution of the first viable seed navigator
//!   population, with restart-on-exhaustion semantics.
//!
//! [`NavigatorGenome`]: crate::genomics::NavigatorGenome
//! [`MazeGenome`]: crate::genomics::MazeGenome
//!
//! A full coevolutionary experiment wiring these together lives in the
//! `mazenav` binary crate.

pub mod behavior;
pub mod evaluators;
pub mod factory;
pub mod genomics;
pub mod geometry;
pub mod networks;
pub mod seeding;
pub mod structure;
pub mod world;
