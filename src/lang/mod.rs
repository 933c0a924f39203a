//! # ash instruction model
//!
//! This module defines what a program is made of. Programs are built either
//! directly in Rust (`Instr::seq`, `From` conversions) or by the parser in
//! `frontend`, and are consumed by the process interpreter in `runtime`.
//!
//! ## Documentation conventions
//!
//! - Stack effects are written as `( before -- after )`.
//! - `{ ... }` denotes a list literal.
//! - `[ ... ]` denotes a sub-program, `'[ ... ]` a quoted one.

pub mod instr;
pub mod value;

pub use instr::{COMMAND_SIGIL, Effect, Instr, Program, program};
pub use value::Value;
