//! ash: a cooperative, virtual-time process scheduler for a small
//! stack-based live-coding language.

pub mod frontend;
pub mod io;
pub mod lang;
pub mod runtime;
