//! Domain logic for the `seqexec` script orchestrator.
//!
//! Discovery, ordering, completion state, subprocess execution, result
//! harvesting and the orchestrator state machine all live here. Concrete
//! history/export/upload collaborators are reached only through the
//! [`sink::Sink`] trait so this crate stays free of database and network
//! dependencies.

pub mod discovery;
pub mod error;
pub mod harvest;
pub mod orchestrator;
pub mod ordering;
pub mod runner;
pub mod scripting;
pub mod sink;
pub mod state;
