//! # GridWatch Engine
//!
//! The tail of the pipeline and the glue around it: the executor that turns
//! analyzer actions into firewall state and dashboard updates, and the
//! supervisor that wires channels, spawns the worker threads, and drives the
//! orderly shutdown sequence.

pub mod executor;
pub mod supervisor;

pub use executor::ActionExecutor;
pub use supervisor::{PipelineError, Supervisor};
