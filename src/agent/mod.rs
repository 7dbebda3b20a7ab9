//! The plan -> execute -> verify pipeline.
//!
//! A user request is broken into an ordered list of tool steps by the
//! [`Planner`], walked by the [`Executor`] (which threads the discovered
//! movie title through later steps), and summarized for the user by the
//! [`Verifier`].

mod executor;
mod planner;
mod verifier;

pub use executor::{
    is_placeholder, prepare_argument, ArgDecision, ExecutionReport, ExecutionResults, Executor,
};
pub use planner::{Plan, Planner, Step};
pub use verifier::Verifier;
