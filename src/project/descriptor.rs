//! Project descriptor (`*.csproj`) reading
//!
//! Only the declarative surface is read: properties from `PropertyGroup`
//! elements and the `Include` of reference items. Conditions, imports and
//! property expansion are not evaluated.

use roxmltree::Document;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("Failed to read project {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse project {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

/// Kind of reference item a name was declared by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// `<Reference Include="Name, Version=...">`
    Assembly,
    /// `<ProjectReference Include="..\Name\Name.csproj">`
    Project,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceItem {
    pub kind: ReferenceKind,
    pub include: String,
}

impl ReferenceItem {
    /// Short assembly name, or `None` when the include is malformed.
    pub fn short_name(&self) -> Option<String> {
        let name = match self.kind {
            ReferenceKind::Assembly => self.include.split(',').next().unwrap_or("").trim(),
            ReferenceKind::Project => {
                let file = self
                    .include
                    .rsplit(['/', '\\'])
                    .next()
                    .unwrap_or(&self.include);
                file.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(file).trim()
            }
        };
        is_valid_assembly_name(name).then(|| name.to_string())
    }
}

fn is_valid_assembly_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_control() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '='))
}

/// Declarative content of one project file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectDescriptor {
    pub path: PathBuf,
    properties: Vec<(String, String)>,
    pub references: Vec<ReferenceItem>,
}

impl ProjectDescriptor {
    pub fn load(path: &Path) -> Result<Self, DescriptorError> {
        let content = std::fs::read_to_string(path).map_err(|source| DescriptorError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    pub fn parse(path: &Path, content: &str) -> Result<Self, DescriptorError> {
        let doc = Document::parse(content).map_err(|e| DescriptorError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let root = doc.root_element();
        if root.tag_name().name() != "Project" {
            return Err(DescriptorError::Parse {
                path: path.to_path_buf(),
                message: format!("root element is <{}>, expected <Project>", root.tag_name().name()),
            });
        }

        let mut properties = Vec::new();
        let mut references = Vec::new();

        for node in root.descendants().filter(|n| n.is_element()) {
            let parent = node.parent_element().map(|p| p.tag_name().name());
            match (parent, node.tag_name().name()) {
                (Some("PropertyGroup"), name) => {
                    let value = node.text().unwrap_or("").trim().to_string();
                    properties.push((name.to_string(), value));
                }
                (Some("ItemGroup"), "Reference") => {
                    if let Some(include) = node.attribute("Include") {
                        references.push(ReferenceItem {
                            kind: ReferenceKind::Assembly,
                            include: include.to_string(),
                        });
                    }
                }
                (Some("ItemGroup"), "ProjectReference") => {
                    if let Some(include) = node.attribute("Include") {
                        references.push(ReferenceItem {
                            kind: ReferenceKind::Project,
                            include: include.to_string(),
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            properties,
            references,
        })
    }

    /// First value of a property, or an empty string.
    pub fn property(&self, name: &str) -> &str {
        self.properties
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .unwrap_or("")
    }

    /// File name without extension.
    pub fn file_stem(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("")
    }

    /// `AssemblyName` property, falling back to the project file name.
    pub fn assembly_name(&self) -> &str {
        match self.property("AssemblyName") {
            "" => self.file_stem(),
            name => name,
        }
    }

    /// Short names of all well-formed references, in declaration order.
    pub fn reference_names(&self) -> Vec<String> {
        self.references.iter().filter_map(|r| r.short_name()).collect()
    }
}
