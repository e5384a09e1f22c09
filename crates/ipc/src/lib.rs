//! Supervised child-process execution for one job per process (§4.3):
//! the parent-side [`ProcJobExecutor`] and the child-side [`ChildRuntime`],
//! connected by `va_protocol::Envelope` framed as newline-delimited JSON
//! over the child's stdio.

mod child;
mod executor;
mod inference;

pub use child::{ChildRuntime, JobHandler};
pub use executor::{JoinReason, ProcJobExecutor};
pub use inference::{InferenceExecutor, InferenceRunner};
