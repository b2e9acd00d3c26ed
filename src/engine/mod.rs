//! Execution engine for graviteectl
//!
//! The engine orchestrates:
//! 1. Planning - Pair manifest entries with recorded state, in phases
//! 2. Diffing - Work out which entries need a change, and which calls it takes
//! 3. Executing - Converge each entry and save the state after every pass

pub mod differ;
pub mod executor;
pub mod planner;

pub use executor::{DialoguerConfirm, TerminalProgress, execute};
pub use planner::build;
