pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{ClassifyArgs, CliArgs, Commands, ExtractArgs, SignaturesArgs};
pub use output::{OutputFormat, OutputFormatter};
