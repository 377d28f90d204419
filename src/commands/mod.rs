//! Subcommand handlers.
//!
//! The engines block, so each handler runs its engine on the blocking pool.

pub mod consume;
pub mod produce;
