use buildgen::cli::commands::{CliArgs, Commands};
use buildgen::cli::handlers::{handle_archive, handle_generate, handle_patch_internals, handle_token};
use buildgen::util::{init_logging, LoggingConfig};
use buildgen::VERSION;

use clap::Parser;
use tracing::debug;

fn main() {
    let args = CliArgs::parse();
    init_logging(LoggingConfig::from_flags(
        args.log_level.as_deref(),
        args.verbose,
        args.quiet,
    ));

    debug!("buildgen v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Generate(generate_args) => handle_generate(generate_args, args.quiet),
        Commands::PatchInternals(patch_args) => handle_patch_internals(patch_args, args.quiet),
        Commands::Token(token_args) => handle_token(token_args),
        Commands::Archive(archive_args) => handle_archive(archive_args, args.quiet),
    };

    std::process::exit(exit_code);
}
