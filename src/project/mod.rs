//! Build units: discovery, descriptor reading and classification

pub mod classify;
pub mod descriptor;
pub mod discovery;

pub use classify::{classify, platform_and_framework};
pub use descriptor::{DescriptorError, ProjectDescriptor, ReferenceItem, ReferenceKind};
pub use discovery::{discover_projects, find_files, DiscoveryConfig};

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Platform partition. Declaration order is the order partitions are built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Platform {
    Standard,
    NetCore,
    Windows,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Standard => "Standard",
            Platform::NetCore => "NetCore",
            Platform::Windows => "Windows",
        };
        f.write_str(name)
    }
}

/// Attributes computed by the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectTraits {
    pub platform: Platform,
    /// Framework version hint for legacy projects without a target framework.
    pub framework_version: Option<String>,
    /// Product annotation for projects under the product folder.
    pub product: Option<String>,
    pub is_test: bool,
    pub is_ui_automation: bool,
    pub is_web_framework: bool,
    pub is_restricted_platform: bool,
}

impl Default for ProjectTraits {
    fn default() -> Self {
        Self {
            platform: Platform::Windows,
            framework_version: None,
            product: None,
            is_test: false,
            is_ui_automation: false,
            is_web_framework: false,
            is_restricted_platform: false,
        }
    }
}

/// One buildable project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub name: String,
    pub path: PathBuf,
    pub references: Vec<String>,
    pub traits: ProjectTraits,
}

impl Unit {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            references: Vec::new(),
            traits: ProjectTraits::default(),
        }
    }

    pub fn with_references<I, S>(mut self, references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.references = references.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.traits.platform = platform;
        self
    }

    pub fn from_descriptor(descriptor: &ProjectDescriptor, product_folder: &str) -> Self {
        Self {
            name: descriptor.assembly_name().to_string(),
            path: descriptor.path.clone(),
            references: descriptor.reference_names(),
            traits: classify(descriptor, product_folder),
        }
    }

    pub fn platform(&self) -> Platform {
        self.traits.platform
    }

    /// Folder holding the project file.
    pub fn folder(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_order() {
        let mut platforms = vec![Platform::Windows, Platform::Standard, Platform::NetCore];
        platforms.sort();
        assert_eq!(
            platforms,
            vec![Platform::Standard, Platform::NetCore, Platform::Windows]
        );
    }

    #[test]
    fn test_unit_from_descriptor() {
        let descriptor = ProjectDescriptor::parse(
            Path::new("Sources/Grid/Grid.csproj"),
            r#"<Project>
                 <PropertyGroup><AssemblyName>Vendor.Grid</AssemblyName><TargetFramework>netstandard2.0</TargetFramework></PropertyGroup>
                 <ItemGroup><Reference Include="Vendor.Data, Version=1.0.0.0" /></ItemGroup>
               </Project>"#,
        )
        .unwrap();

        let unit = Unit::from_descriptor(&descriptor, "XPF");
        assert_eq!(unit.name, "Vendor.Grid");
        assert_eq!(unit.references, vec!["Vendor.Data"]);
        assert_eq!(unit.platform(), Platform::Standard);
        assert_eq!(unit.folder(), Path::new("Sources/Grid"));
    }
}
