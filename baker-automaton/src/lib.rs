//! The pure state-transition core of the baker consensus automaton
//!: `step(state, event) -> (state, action)`, with no I/O.
//! Everything effectful the transition decides on is described by an
//! `Action` for a sibling crate's executor to carry out.

pub mod action;
pub mod event;
mod step;

pub use action::{Action, BlockKind, BlockToBake, ConsensusOpItem};
pub use event::{Event, TimeoutKind};
pub use step::{resume_synchronize_round, resume_update_to_level, step};
