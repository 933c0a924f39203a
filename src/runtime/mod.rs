//! Virtual-time execution: scopes, processes and the scheduler that
//! interleaves them.

pub mod builtins;
pub mod commands;
pub mod context;
pub mod effects;
pub mod process;
pub mod runtime_error;
pub mod scheduler;
pub mod tempo;

pub use commands::{Commands, Handler, Library};
pub use context::Context;
pub use effects::EffectQueue;
pub use process::{Diagnostic, Process};
pub use runtime_error::{ErrorKind, RuntimeError};
pub use scheduler::{Fork, ProcessRef, Scheduler, SchedulerConfig};
pub use tempo::{SharedTempo, Tempo};
