//! Command handlers. Each returns the process exit code.

use super::commands::{ArchiveArgs, GenerateArgs, OutputFormatArg, PatchInternalsArgs, TokenArgs};
use super::output::OutputFormatter;
use crate::archive::create_archive;
use crate::config::GeneratorConfig;
use crate::identity::KeyMaterial;
use crate::patch::patch_files;
use crate::script::Generator;
use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

fn report_failure(err: &anyhow::Error) -> i32 {
    error!("{:#}", err);
    eprintln!("error: {:#}", err);
    1
}

fn emit(format: OutputFormatArg, render: impl FnOnce(&OutputFormatter) -> Result<String>) -> Result<()> {
    let formatter = OutputFormatter::new(format.into());
    println!("{}", render(&formatter)?);
    Ok(())
}

fn run_generate(args: &GenerateArgs, quiet: bool) -> Result<()> {
    let config = GeneratorConfig::default();
    debug!("{}", config);

    let options = args.to_options()?;
    if let Some(root) = &args.root {
        warn!(
            root = %root.display(),
            "Building into the installation folder replaces the original assemblies"
        );
    }

    let report = Generator::new(options, config)
        .run()
        .context("Build script generation failed")?;

    if !quiet {
        emit(args.format, |f| f.format_report(&report))?;
    }
    Ok(())
}

pub fn handle_generate(args: &GenerateArgs, quiet: bool) -> i32 {
    info!("Generating build script");
    match run_generate(args, quiet) {
        Ok(()) => 0,
        Err(e) => report_failure(&e),
    }
}

fn run_patch_internals(args: &PatchInternalsArgs, quiet: bool) -> Result<()> {
    let material = KeyMaterial::from_key_file(&args.key)
        .with_context(|| format!("Cannot derive identity from {}", args.key.display()))?;
    info!(token = %material.token, files = args.files.len(), "Patching identity markers");

    let summary = patch_files(&args.files, &material)?;
    if !quiet {
        emit(OutputFormatArg::Human, |f| f.format_patch(&summary))?;
    }
    Ok(())
}

pub fn handle_patch_internals(args: &PatchInternalsArgs, quiet: bool) -> i32 {
    match run_patch_internals(args, quiet) {
        Ok(()) => 0,
        Err(e) => report_failure(&e),
    }
}

pub fn handle_token(args: &TokenArgs) -> i32 {
    let result = KeyMaterial::from_key_file(&args.key)
        .with_context(|| format!("Cannot derive identity from {}", args.key.display()))
        .and_then(|material| emit(args.format, |f| f.format_key(&material)));
    match result {
        Ok(()) => 0,
        Err(e) => report_failure(&e),
    }
}

pub fn handle_archive(args: &ArchiveArgs, quiet: bool) -> i32 {
    let result = create_archive(&args.output, &args.working_dir, &args.files)
        .map_err(anyhow::Error::from)
        .and_then(|summary| {
            if quiet {
                return Ok(());
            }
            emit(OutputFormatArg::Human, |f| f.format_archive(&summary))
        });
    match result {
        Ok(()) => 0,
        Err(e) => report_failure(&e),
    }
}
