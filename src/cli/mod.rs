pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{ArchiveArgs, CliArgs, Commands, GenerateArgs, PatchInternalsArgs, TokenArgs};
pub use output::{OutputFormat, OutputFormatter};
