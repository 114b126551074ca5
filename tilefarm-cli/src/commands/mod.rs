//! CLI command implementations.
//!
//! Each command module exposes its clap argument type and a `run`
//! function returning `Result<(), CliError>`.

pub mod assemble;
pub mod common;
pub mod config;
pub mod plan;
pub mod submit;
pub mod validate;
