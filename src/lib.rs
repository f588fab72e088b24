//! buildgen - MSBuild script generator for large multi-project .NET trees
//!
//! The generator discovers every project file beneath a source directory,
//! splits the projects into platform partitions and orders each partition so
//! that dependencies build first. Projects that are filtered out, and every
//! project that depends on one, are left out of the script.
//!
//! # Core Concepts
//!
//! - **Unit**: one project, identified by its assembly name
//! - **Partition**: the units of one platform; references never cross partitions
//! - **Excluded set**: names that must not be built, seeded by filters and
//!   grown by resolution
//! - **External reference**: a vendor assembly that is not built from source
//!   and is copied from the references directory instead
//!
//! # Example
//!
//! ```
//! use buildgen::graph::{resolve, NameSet};
//! use buildgen::project::Unit;
//!
//! let units = vec![
//!     Unit::new("App", "App/App.csproj").with_references(["Lib", "DevExpress.Data"]),
//!     Unit::new("Lib", "Lib/Lib.csproj"),
//! ];
//! let resolution = resolve(&units, &NameSet::new(), "DevExpress");
//! assert_eq!(resolution.names(), vec!["Lib", "App"]);
//! assert!(resolution.external_refs.contains("DevExpress.Data"));
//! ```
//!
//! # Project Structure
//!
//! - [`project`]: discovery, descriptor parsing and classification
//! - [`graph`]: build order resolution
//! - [`script`]: template output and the generation run
//! - [`identity`], [`patch`]: strong-name identities and source rewriting
//! - [`archive`]: packing build outputs

pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod identity;
pub mod patch;
pub mod project;
pub mod script;
pub mod util;

pub use config::{ConfigError, GeneratorConfig};
pub use error::GeneratorError;
pub use graph::{resolve, resolve_partitions, NameSet, Resolution};
pub use identity::{derive_identity_token, derive_public_key, KeyError, KeyMaterial};
pub use project::{Platform, ProjectTraits, Unit};
pub use script::{GenerateOptions, GenerationReport, Generator};
pub use util::{init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
