//! Scripted replay of a collaborative session, driving several participants
//! through the relay.

pub mod runner;
pub mod script;

pub use runner::{run, ParticipantOutcome, ReplayOutcome};
pub use script::{Script, Step};
