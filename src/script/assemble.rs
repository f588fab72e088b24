use super::template::{Item, ItemGroup};
use crate::graph::Partitions;
use crate::project::Platform;
use crate::util::paths::{relative_to, to_backslashes};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const PROJECT_ITEM: &str = "ProjectToBuild";
pub const REFERENCE_ITEM: &str = "ReferenceFile";
pub const PATCH_ITEM: &str = "PatchInternalsVisibleTo";

/// Where item paths are rooted.
#[derive(Debug, Clone)]
pub struct ScriptLayout {
    pub source_dir: PathBuf,
    /// MSBuild property that holds `source_dir` inside the script.
    pub source_dir_property: String,
}

impl ScriptLayout {
    /// `$(Property)\relative\path` for a file beneath the source directory.
    pub fn source_item(&self, path: &Path) -> String {
        let relative = relative_to(path, &self.source_dir);
        format!(
            "$({})\\{}",
            self.source_dir_property,
            to_backslashes(&relative)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildEntry {
    pub include: String,
    pub platform: Platform,
    pub framework_version: Option<String>,
    pub product: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceEntry {
    pub include: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchEntry {
    pub include: String,
}

/// Everything the script lists, in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildDescriptor {
    /// Build entries per partition, partitions in platform order.
    pub partitions: Vec<(Platform, Vec<BuildEntry>)>,
    pub references: Vec<ReferenceEntry>,
    pub patches: Vec<PatchEntry>,
}

impl BuildDescriptor {
    pub fn entries(&self) -> impl Iterator<Item = &BuildEntry> {
        self.partitions.iter().flat_map(|(_, entries)| entries.iter())
    }

    /// Item groups in the order they go into the script: one per non-empty
    /// partition, then references, then marker files.
    pub fn item_groups(&self) -> Vec<ItemGroup> {
        let mut groups = Vec::with_capacity(self.partitions.len() + 2);
        for (_, entries) in &self.partitions {
            if entries.is_empty() {
                continue;
            }
            let mut group = ItemGroup::new(PROJECT_ITEM);
            for entry in entries {
                let mut item = Item::new(entry.include.as_str())
                    .with_metadata("Platform", entry.platform.to_string());
                if let Some(version) = &entry.framework_version {
                    item = item.with_metadata("FrameworkVersion", version.as_str());
                }
                if let Some(product) = &entry.product {
                    item = item.with_metadata("Product", product.as_str());
                }
                group.push(item);
            }
            groups.push(group);
        }

        let mut references = ItemGroup::new(REFERENCE_ITEM);
        for entry in &self.references {
            references.push(Item::new(entry.include.as_str()));
        }
        groups.push(references);

        let mut patches = ItemGroup::new(PATCH_ITEM);
        for entry in &self.patches {
            patches.push(Item::new(entry.include.as_str()));
        }
        groups.push(patches);

        groups
    }
}

/// Build the descriptor from resolved partitions, the final reference file
/// paths and the marker files.
pub fn assemble(
    resolutions: &Partitions,
    reference_files: &[PathBuf],
    patch_files: &[PathBuf],
    layout: &ScriptLayout,
) -> BuildDescriptor {
    let partitions = resolutions
        .iter()
        .map(|(platform, resolution)| {
            let entries = resolution
                .ordered
                .iter()
                .map(|unit| BuildEntry {
                    include: layout.source_item(&unit.path),
                    platform: *platform,
                    framework_version: unit.traits.framework_version.clone(),
                    product: unit.traits.product.clone(),
                })
                .collect();
            (*platform, entries)
        })
        .collect();

    let references = reference_files
        .iter()
        .map(|path| ReferenceEntry {
            include: path.display().to_string(),
        })
        .collect();

    let patches = patch_files
        .iter()
        .map(|path| PatchEntry {
            include: layout.source_item(path),
        })
        .collect();

    BuildDescriptor {
        partitions,
        references,
        patches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{resolve_partitions, NameSet};
    use crate::project::Unit;

    fn layout() -> ScriptLayout {
        ScriptLayout {
            source_dir: PathBuf::from("/src"),
            source_dir_property: "DevExpressSourceDir".to_string(),
        }
    }

    #[test]
    fn test_source_item() {
        assert_eq!(
            layout().source_item(Path::new("/src/Grid/Grid.csproj")),
            "$(DevExpressSourceDir)\\Grid\\Grid.csproj"
        );
    }

    #[test]
    fn test_assemble_orders_partitions_and_units() {
        let mut lib = Unit::new("Lib", "/src/Lib/Lib.csproj").with_platform(Platform::Windows);
        lib.traits.framework_version = Some("v4.6".to_string());
        let mut app = Unit::new("App", "/src/XPF/App/App.csproj")
            .with_platform(Platform::Windows)
            .with_references(["Lib"]);
        app.traits.product = Some("Xpf".to_string());
        let std_unit = Unit::new("Core", "/src/Core/Core.csproj").with_platform(Platform::Standard);

        let partitions = resolve_partitions(&[app, lib, std_unit], &NameSet::new(), "DevExpress");
        let descriptor = assemble(
            &partitions,
            &[PathBuf::from("/refs/DevExpress.Data.dll")],
            &[PathBuf::from("/src/Lib/Properties/AssemblyInfo.cs")],
            &layout(),
        );

        let includes: Vec<_> = descriptor.entries().map(|e| e.include.as_str()).collect();
        assert_eq!(
            includes,
            vec![
                "$(DevExpressSourceDir)\\Core\\Core.csproj",
                "$(DevExpressSourceDir)\\Lib\\Lib.csproj",
                "$(DevExpressSourceDir)\\XPF\\App\\App.csproj",
            ]
        );
        let lib_entry = &descriptor.partitions[1].1[0];
        assert_eq!(lib_entry.framework_version.as_deref(), Some("v4.6"));
        assert_eq!(descriptor.partitions[1].1[1].product.as_deref(), Some("Xpf"));
        assert_eq!(descriptor.references[0].include, "/refs/DevExpress.Data.dll");
        assert_eq!(
            descriptor.patches[0].include,
            "$(DevExpressSourceDir)\\Lib\\Properties\\AssemblyInfo.cs"
        );
    }

    #[test]
    fn test_item_groups() {
        let descriptor = BuildDescriptor {
            partitions: vec![
                (
                    Platform::Standard,
                    vec![BuildEntry {
                        include: "$(S)\\A.csproj".to_string(),
                        platform: Platform::Standard,
                        framework_version: None,
                        product: None,
                    }],
                ),
                (Platform::Windows, Vec::new()),
            ],
            references: Vec::new(),
            patches: Vec::new(),
        };

        let groups = descriptor.item_groups();
        let names: Vec<_> = groups.iter().map(|g| g.item_name.as_str()).collect();
        assert_eq!(names, vec![PROJECT_ITEM, REFERENCE_ITEM, PATCH_ITEM]);
        assert_eq!(
            groups[0].items[0].metadata,
            vec![("Platform".to_string(), "Standard".to_string())]
        );
    }
}
