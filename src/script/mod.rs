//! Build script generation

pub mod assemble;
pub mod generator;
pub mod references;
pub mod template;

pub use assemble::{assemble, BuildDescriptor, BuildEntry, PatchEntry, ReferenceEntry, ScriptLayout};
pub use generator::{
    FilterReason, FilteredUnit, GenerateOptions, GenerationReport, Generator, PartitionSummary,
};
pub use references::{copy_references, ReferenceFiles, ReferenceLocator};
pub use template::{Item, ItemGroup, Template, TemplateError};
