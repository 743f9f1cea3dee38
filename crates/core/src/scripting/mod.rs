//! Subprocess execution for discovered scripts.
//!
//! [`crate::runner`] picks an [`interpreter::InterpreterExecutor`] per unit
//! and reduces its result to a [`crate::runner::RunOutcome`].

pub mod executor;
pub mod interpreter;
pub mod subprocess;
