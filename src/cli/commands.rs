use crate::error::GeneratorError;
use crate::script::generator::{GenerateOptions, DEFAULT_OUTPUT, DEFAULT_TEMPLATE};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// MSBuild script generator for multi-project .NET source trees
#[derive(Parser, Debug)]
#[command(
    name = "buildgen",
    about = "MSBuild script generator for multi-project .NET source trees",
    version,
    author,
    long_about = "buildgen scans a source tree for project files, orders them so every \
                  project builds after its dependencies, and writes a build script from \
                  a template. It also stamps strong-name identities into sources and \
                  packs build outputs."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug output")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Generate a build script for a source tree",
        long_about = "Discovers every project under the source directory, drops filtered \
                      projects and everything that depends on them, and writes the build \
                      order into the template.\n\n\
                      Examples:\n  \
                      buildgen generate -x C:\\DevExpress\n  \
                      buildgen generate -s Sources -r Bin/Framework -o build.proj --notest\n  \
                      buildgen generate -s Sources -r refs --copyrefdir out/refs -f json"
    )]
    Generate(GenerateArgs),

    #[command(
        about = "Stamp a strong-name identity into source files",
        long_about = "Rewrites PublicKeyToken, PublicKey and InternalsVisibleTo markers with \
                      values derived from the key file. Files already carrying the values \
                      are left untouched.\n\n\
                      Examples:\n  \
                      buildgen patch-internals --key StrongKey.snk Properties/AssemblyInfo.cs"
    )]
    PatchInternals(PatchInternalsArgs),

    #[command(about = "Print the public key and token of a key file")]
    Token(TokenArgs),

    #[command(
        about = "Pack files into a zip archive",
        long_about = "Entry names are the file paths relative to the working directory.\n\n\
                      Examples:\n  \
                      buildgen archive --output bin.zip --working-dir Bin Bin/Framework/*.dll"
    )]
    Archive(ArchiveArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(
        short = 'x',
        long = "root",
        value_name = "DIR",
        help = "Vendor installation root; sources from <DIR>/Sources, references and output in <DIR>/Bin/Framework"
    )]
    pub root: Option<PathBuf>,

    #[arg(
        long = "output-path",
        visible_alias = "op",
        value_name = "DIR",
        help = "Value of the OutputPath property"
    )]
    pub output_path: Option<PathBuf>,

    #[arg(short = 't', long, value_name = "FILE", default_value = DEFAULT_TEMPLATE, help = "Template file")]
    pub template: PathBuf,

    #[arg(short = 'o', long, value_name = "FILE", default_value = DEFAULT_OUTPUT, help = "Output file")]
    pub output: PathBuf,

    #[arg(short = 's', long, value_name = "DIR", help = "Source directory")]
    pub source: Option<PathBuf>,

    #[arg(short = 'r', long, value_name = "DIR", help = "Reference assemblies directory")]
    pub references: Option<PathBuf>,

    #[arg(long, help = "Skip test projects")]
    pub notest: bool,

    #[arg(long, help = "Skip ASP.NET MVC projects")]
    pub nomvc: bool,

    #[arg(long, help = "Skip WinRT projects")]
    pub nowinrt: bool,

    #[arg(
        long,
        value_name = "DIR",
        help = "Copy reference files here and list them relative to the output file"
    )]
    pub copyrefdir: Option<PathBuf>,

    #[arg(
        long,
        value_name = "FILE",
        help = "Write 'assembly:folder' lines for every included project"
    )]
    pub assembly_folders_file: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Summary format"
    )]
    pub format: OutputFormatArg,
}

impl GenerateArgs {
    /// Resolve the run's inputs. `--root` supplies defaults that explicit
    /// paths override.
    pub fn to_options(&self) -> Result<GenerateOptions, GeneratorError> {
        let mut options = match (&self.root, &self.source, &self.references) {
            (Some(root), _, _) => GenerateOptions::from_root(root),
            (None, Some(source), Some(references)) => {
                GenerateOptions::new(source.clone(), references.clone())
            }
            _ => return Err(GeneratorError::NoInputPaths),
        };

        if let Some(source) = &self.source {
            options.source_dir = source.clone();
        }
        if let Some(references) = &self.references {
            options.references_dir = references.clone();
        }
        if let Some(output_path) = &self.output_path {
            options.output_path = Some(output_path.clone());
        }
        options.template = self.template.clone();
        options.output = self.output.clone();
        options.skip_tests = self.notest;
        options.skip_web = self.nomvc;
        options.skip_restricted = self.nowinrt;
        options.copy_references_dir = self.copyrefdir.clone();
        options.assembly_folders_file = self.assembly_folders_file.clone();
        Ok(options)
    }
}

#[derive(Parser, Debug, Clone)]
pub struct PatchInternalsArgs {
    #[arg(short = 'k', long, value_name = "SNK", help = "Strong-name key file")]
    pub key: PathBuf,

    #[arg(value_name = "FILES", required = true, help = "Source files to patch")]
    pub files: Vec<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct TokenArgs {
    #[arg(value_name = "SNK", help = "Strong-name key or public key file")]
    pub key: PathBuf,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ArchiveArgs {
    #[arg(short = 'o', long, value_name = "FILE", help = "Archive to create")]
    pub output: PathBuf,

    #[arg(short = 'w', long, value_name = "DIR", help = "Directory entry names are relative to")]
    pub working_dir: PathBuf,

    #[arg(value_name = "FILES", required = true, help = "Files to pack")]
    pub files: Vec<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}
