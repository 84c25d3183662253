pub mod args;

pub use args::{Arguments, Simulator};
use clap::Parser;

use crate::config::defs::PipelineError;

pub fn parse() -> Arguments {
    Arguments::parse()
}

/// Unwraps a module-specific argument, naming the missing flag.
pub fn required_arg<'a>(value: &'a Option<String>, flag: &str) -> Result<&'a str, PipelineError> {
    value
        .as_deref()
        .ok_or_else(|| PipelineError::InvalidConfig(format!("{} is required", flag)))
}
