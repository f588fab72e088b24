//! One generation run
//!
//! Discovery, classification, filtering, resolution, reference lookup and
//! script output, in that order, on a single thread. Input paths are checked
//! before any work starts; after that only template, targets and I/O
//! failures abort the run.

use super::assemble::{assemble, ScriptLayout};
use super::references::{copy_references, ReferenceFiles, ReferenceLocator};
use super::template::Template;
use crate::config::GeneratorConfig;
use crate::error::GeneratorError;
use crate::graph::{external_refs, resolve_partitions, NameSet, Partitions};
use crate::patch::{retarget_targets_file, should_patch};
use crate::project::{discover_projects, find_files, DiscoveryConfig, Platform, ProjectDescriptor, Unit};
use crate::util::paths::{absolute, relative_to};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_TEMPLATE: &str = "Template.proj";
pub const DEFAULT_OUTPUT: &str = "build.proj";

const OUTPUT_PATH_PROPERTY: &str = "OutputPath";
const TASKS_ASSEMBLY_PROPERTY: &str = "TasksAssembly";
const BUILD_TASKS_PATH: &str = "$(BuildTasksPath)";
const TARGETS_EXTENSION: &str = "targets";
// Matched case-insensitively against lowercased file names.
const MARKER_FILE_PREFIX: &str = "assembly";
const MARKER_FILE_EXTENSION: &str = ".cs";

/// Inputs of a run, resolved from the command line.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub source_dir: PathBuf,
    pub references_dir: PathBuf,
    pub template: PathBuf,
    pub output: PathBuf,
    /// Value for the template's `OutputPath` property.
    pub output_path: Option<PathBuf>,
    pub skip_tests: bool,
    pub skip_web: bool,
    pub skip_restricted: bool,
    /// Copy reference files here and list them relative to the output file.
    pub copy_references_dir: Option<PathBuf>,
    /// Write `name:folder` lines for every included unit.
    pub assembly_folders_file: Option<PathBuf>,
    /// Tool path written to `TasksAssembly`; defaults to the running binary.
    pub tasks_assembly: Option<PathBuf>,
}

impl GenerateOptions {
    pub fn new(source_dir: impl Into<PathBuf>, references_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            references_dir: references_dir.into(),
            template: PathBuf::from(DEFAULT_TEMPLATE),
            output: PathBuf::from(DEFAULT_OUTPUT),
            output_path: None,
            skip_tests: false,
            skip_web: false,
            skip_restricted: false,
            copy_references_dir: None,
            assembly_folders_file: None,
            tasks_assembly: None,
        }
    }

    /// Layout of a vendor installation: sources under `Sources`, binaries
    /// read from and written to `Bin/Framework`.
    pub fn from_root(root: &Path) -> Self {
        let framework = root.join("Bin").join("Framework");
        let mut options = Self::new(root.join("Sources"), framework.clone());
        options.output_path = Some(framework);
        options
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterReason {
    Test,
    WebFramework,
    RestrictedPlatform,
    UiAutomation,
    HardExcluded,
}

impl fmt::Display for FilterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FilterReason::Test => "test project",
            FilterReason::WebFramework => "MVC project",
            FilterReason::RestrictedPlatform => "WinRT project",
            FilterReason::UiAutomation => "Coded UI project",
            FilterReason::HardExcluded => "excluded by name",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilteredUnit {
    pub name: String,
    pub reason: FilterReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionSummary {
    pub platform: Platform,
    pub built: usize,
    pub dropped: Vec<String>,
    pub cycles: usize,
}

/// What a run produced, for the command summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub output: PathBuf,
    pub partitions: Vec<PartitionSummary>,
    pub filtered: Vec<FilteredUnit>,
    pub skipped_descriptors: Vec<PathBuf>,
    pub external_refs: Vec<String>,
    pub reference_files: Vec<PathBuf>,
    pub patch_files: Vec<PathBuf>,
    pub task_assembly: Option<PathBuf>,
    pub retargeted: Vec<PathBuf>,
    pub assembly_folders_file: Option<PathBuf>,
}

impl GenerationReport {
    pub fn total_built(&self) -> usize {
        self.partitions.iter().map(|p| p.built).sum()
    }

    pub fn total_dropped(&self) -> usize {
        self.partitions.iter().map(|p| p.dropped.len()).sum()
    }
}

/// Included units plus everything learned while loading them.
#[derive(Debug, Default)]
struct LoadedUnits {
    units: Vec<Unit>,
    excluded: NameSet,
    filtered: Vec<FilteredUnit>,
    skipped: Vec<PathBuf>,
    folders: Vec<(String, PathBuf)>,
}

impl LoadedUnits {
    fn record_folder(&mut self, unit: &Unit) {
        let folder = unit.folder().to_path_buf();
        match self.folders.iter_mut().find(|(name, _)| *name == unit.name) {
            Some(entry) => entry.1 = folder,
            None => self.folders.push((unit.name.clone(), folder)),
        }
    }
}

pub struct Generator {
    options: GenerateOptions,
    config: GeneratorConfig,
}

fn absolutize(path: &Path) -> Result<PathBuf, GeneratorError> {
    absolute(path).map_err(|e| GeneratorError::Filesystem(format!(
        "Failed to resolve {}: {}",
        path.display(),
        e
    )))
}

impl Generator {
    pub fn new(options: GenerateOptions, config: GeneratorConfig) -> Self {
        Self { options, config }
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    fn validate_inputs(&self) -> Result<(), GeneratorError> {
        self.config.validate()?;

        let options = &self.options;
        if !options.source_dir.is_dir() {
            return Err(GeneratorError::input_missing("Source directory", &options.source_dir));
        }
        if !options.references_dir.is_dir() {
            return Err(GeneratorError::input_missing(
                "References directory",
                &options.references_dir,
            ));
        }
        if !options.template.is_file() {
            return Err(GeneratorError::input_missing("Template file", &options.template));
        }
        Ok(())
    }

    fn filter_reason(&self, unit: &Unit) -> Option<FilterReason> {
        let traits = &unit.traits;
        if traits.is_test && self.options.skip_tests {
            Some(FilterReason::Test)
        } else if traits.is_web_framework && self.options.skip_web {
            Some(FilterReason::WebFramework)
        } else if traits.is_restricted_platform && self.options.skip_restricted {
            Some(FilterReason::RestrictedPlatform)
        } else if traits.is_ui_automation {
            Some(FilterReason::UiAutomation)
        } else if self.config.is_hard_excluded(&unit.name) {
            Some(FilterReason::HardExcluded)
        } else {
            None
        }
    }

    fn load_units(&self, source_dir: &Path) -> Result<LoadedUnits, GeneratorError> {
        let paths = discover_projects(source_dir, &DiscoveryConfig::default())
            .map_err(|e| GeneratorError::scan(source_dir, e))?;
        info!(count = paths.len(), dir = %source_dir.display(), "Discovered project files");

        let mut loaded = LoadedUnits::default();
        for path in paths {
            let descriptor = match ProjectDescriptor::load(&path) {
                Ok(d) => d,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable project");
                    loaded.skipped.push(path);
                    continue;
                }
            };

            let unit = Unit::from_descriptor(&descriptor, &self.config.product_folder);
            if let Some(reason) = self.filter_reason(&unit) {
                debug!(unit = %unit.name, reason = %reason, "Filtered out");
                loaded.excluded.insert(&unit.name);
                loaded.filtered.push(FilteredUnit {
                    name: unit.name,
                    reason,
                });
                continue;
            }

            loaded.record_folder(&unit);
            loaded.units.push(unit);
        }
        Ok(loaded)
    }

    fn resolve(&self, loaded: &LoadedUnits) -> Partitions {
        let partitions = resolve_partitions(&loaded.units, &loaded.excluded, &self.config.vendor_prefix);
        for (platform, resolution) in &partitions {
            for name in &resolution.dropped {
                info!(platform = %platform, unit = %name, "Dropped: depends on an excluded project");
            }
            for edge in &resolution.cycles {
                debug!(platform = %platform, from = %edge.from, to = %edge.to, "Reference cycle");
            }
        }
        partitions
    }

    /// Locate reference files and retarget `.targets` files when the build
    /// task assembly is available.
    fn collect_references(
        &self,
        partitions: &Partitions,
        source_dir: &Path,
        references_dir: &Path,
        report: &mut GenerationReport,
    ) -> Result<ReferenceFiles, GeneratorError> {
        let locator = ReferenceLocator::new(references_dir)
            .map_err(|e| GeneratorError::scan(references_dir, e))?;

        let mut files = ReferenceFiles::new();
        for resolution in partitions.values() {
            files.extend(locator.locate(&resolution.external_refs));
        }

        if let Some(entity_framework) = locator.entity_framework() {
            files.add(entity_framework);
        }

        match locator.task_assembly(&self.config.task_assembly_prefix) {
            Some(task_assembly) => {
                let file_name = task_assembly
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let task_path = format!("{}\\{}", BUILD_TASKS_PATH, file_name);
                report.retargeted = self.retarget_targets(source_dir, &task_path)?;
                files.add(task_assembly.clone());
                report.task_assembly = Some(task_assembly);
            }
            None => warn!(
                prefix = %self.config.task_assembly_prefix,
                "Build task assembly not found among references"
            ),
        }

        Ok(files)
    }

    fn retarget_targets(&self, source_dir: &Path, task_path: &str) -> Result<Vec<PathBuf>, GeneratorError> {
        let targets = find_files(source_dir, &DiscoveryConfig::default(), |path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(TARGETS_EXTENSION))
        })
        .map_err(|e| GeneratorError::scan(source_dir, e))?;

        let mut retargeted = Vec::new();
        for path in targets {
            if retarget_targets_file(&path, &self.config.task_assembly_prefix, task_path)? {
                retargeted.push(path);
            }
        }
        Ok(retargeted)
    }

    /// `Assembly*.cs` files that carry identity markers, in any letter case.
    fn find_marker_files(&self, source_dir: &Path) -> Result<Vec<PathBuf>, GeneratorError> {
        let candidates = find_files(source_dir, &DiscoveryConfig::default(), |path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(str::to_ascii_lowercase)
                .is_some_and(|n| n.starts_with(MARKER_FILE_PREFIX) && n.ends_with(MARKER_FILE_EXTENSION))
        })
        .map_err(|e| GeneratorError::scan(source_dir, e))?;

        let mut marker_files = Vec::new();
        for path in candidates {
            match fs::read_to_string(&path) {
                Ok(content) if should_patch(&content) => marker_files.push(path),
                Ok(_) => {}
                Err(e) => warn!(file = %path.display(), error = %e, "Skipping unreadable source file"),
            }
        }
        debug!(count = marker_files.len(), "Found identity marker files");
        Ok(marker_files)
    }

    fn write_folder_map(&self, path: &Path, folders: &[(String, PathBuf)]) -> Result<(), GeneratorError> {
        let mut content = String::new();
        for (name, folder) in folders {
            content.push_str(&format!("{}:{}\n", name, folder.display()));
        }
        fs::write(path, content).map_err(|source| GeneratorError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!(file = %path.display(), entries = folders.len(), "Wrote assembly folder map");
        Ok(())
    }

    pub fn run(&self) -> Result<GenerationReport, GeneratorError> {
        self.validate_inputs()?;

        let source_dir = absolutize(&self.options.source_dir)?;
        let references_dir = absolutize(&self.options.references_dir)?;
        let output = absolutize(&self.options.output)?;
        let output_dir = output.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut template = Template::load(&self.options.template)?;
        if let Some(output_path) = &self.options.output_path {
            template.set_property(OUTPUT_PATH_PROPERTY, &output_path.display().to_string())?;
        }
        template.set_property(
            &self.config.source_dir_property,
            &source_dir.display().to_string(),
        )?;
        let tasks_assembly = match &self.options.tasks_assembly {
            Some(path) => absolutize(path)?,
            None => std::env::current_exe().map_err(|e| {
                GeneratorError::Filesystem(format!("Failed to locate the running binary: {}", e))
            })?,
        };
        template.set_property(
            TASKS_ASSEMBLY_PROPERTY,
            &relative_to(&tasks_assembly, &output_dir).display().to_string(),
        )?;

        let loaded = self.load_units(&source_dir)?;
        let partitions = self.resolve(&loaded);

        let mut report = GenerationReport {
            output: output.clone(),
            filtered: loaded.filtered.clone(),
            skipped_descriptors: loaded.skipped.clone(),
            external_refs: external_refs(&partitions).iter().map(String::from).collect(),
            ..Default::default()
        };

        let references = self.collect_references(&partitions, &source_dir, &references_dir, &mut report)?;
        let reference_entries = match &self.options.copy_references_dir {
            Some(copy_dir) => {
                let copy_dir = absolutize(copy_dir)?;
                copy_references(references.files(), &copy_dir, &output_dir)
                    .map_err(|e| GeneratorError::Filesystem(format!("{:#}", e)))?
            }
            None => references.files().to_vec(),
        };

        let marker_files = self.find_marker_files(&source_dir)?;

        let layout = ScriptLayout {
            source_dir: source_dir.clone(),
            source_dir_property: self.config.source_dir_property.clone(),
        };
        let descriptor = assemble(&partitions, &reference_entries, &marker_files, &layout);
        for group in descriptor.item_groups() {
            template.append_item_group(group);
        }
        template.write_to(&output)?;
        info!(
            output = %output.display(),
            projects = descriptor.entries().count(),
            references = reference_entries.len(),
            "Wrote build script"
        );

        if let Some(folders_file) = &self.options.assembly_folders_file {
            self.write_folder_map(folders_file, &loaded.folders)?;
            report.assembly_folders_file = Some(folders_file.clone());
        }

        report.partitions = partitions
            .iter()
            .map(|(platform, resolution)| PartitionSummary {
                platform: *platform,
                built: resolution.ordered.len(),
                dropped: resolution.dropped.clone(),
                cycles: resolution.cycles.len(),
            })
            .collect();
        report.reference_files = reference_entries;
        report.patch_files = marker_files;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEMPLATE: &str = r#"<Project>
  <PropertyGroup>
    <OutputPath />
    <DevExpressSourceDir />
    <TasksAssembly />
  </PropertyGroup>
</Project>
"#;

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn project(refs: &[&str]) -> String {
        let items: String = refs
            .iter()
            .map(|r| format!(r#"<Reference Include="{}, Version=1.0.0.0" />"#, r))
            .collect();
        format!(
            "<Project><PropertyGroup><TargetFramework>net48</TargetFramework></PropertyGroup><ItemGroup>{}</ItemGroup></Project>",
            items
        )
    }

    fn config() -> GeneratorConfig {
        GeneratorConfig {
            vendor_prefix: "DevExpress".to_string(),
            excluded_fragments: vec!["SharePoint".to_string()],
            product_folder: "XPF".to_string(),
            source_dir_property: "DevExpressSourceDir".to_string(),
            task_assembly_prefix: "DevExpress.Build.XamlResourceProcessing".to_string(),
            log_level: "info".to_string(),
        }
    }

    fn options(dir: &Path) -> GenerateOptions {
        let mut options = GenerateOptions::new(dir.join("src"), dir.join("refs"));
        options.template = dir.join("Template.proj");
        options.output = dir.join("build.proj");
        options.tasks_assembly = Some(dir.join("tools/buildgen"));
        options
    }

    fn setup() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "Template.proj", TEMPLATE);
        fs::create_dir_all(dir.path().join("refs")).unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        dir
    }

    #[test]
    fn test_from_root_layout() {
        let options = GenerateOptions::from_root(Path::new("/dx"));
        assert_eq!(options.source_dir, PathBuf::from("/dx/Sources"));
        assert_eq!(options.references_dir, PathBuf::from("/dx/Bin/Framework"));
        assert_eq!(options.output_path, Some(PathBuf::from("/dx/Bin/Framework")));
        assert_eq!(options.template, PathBuf::from(DEFAULT_TEMPLATE));
        assert_eq!(options.output, PathBuf::from(DEFAULT_OUTPUT));
    }

    #[test]
    fn test_missing_template_fails_first() {
        let dir = setup();
        fs::remove_file(dir.path().join("Template.proj")).unwrap();
        let err = Generator::new(options(dir.path()), config()).run().unwrap_err();
        assert!(matches!(err, GeneratorError::InputMissing { what: "Template file", .. }));
        assert!(!dir.path().join("build.proj").exists());
    }

    #[test]
    fn test_missing_source_dir() {
        let dir = setup();
        let mut opts = options(dir.path());
        opts.source_dir = dir.path().join("nope");
        let err = Generator::new(opts, config()).run().unwrap_err();
        assert!(matches!(err, GeneratorError::InputMissing { what: "Source directory", .. }));
    }

    #[test]
    fn test_filters_seed_exclusion() {
        let dir = setup();
        write(
            dir.path(),
            "src/Tests/DevExpress.Tests.csproj",
            "<Project><PropertyGroup><IsTestProject>true</IsTestProject></PropertyGroup></Project>",
        );
        write(dir.path(), "src/App/DevExpress.App.csproj", &project(&["DevExpress.Tests"]));
        write(dir.path(), "src/Lib/DevExpress.Lib.csproj", &project(&[]));
        write(dir.path(), "src/SP/DevExpress.SharePoint.csproj", &project(&[]));

        let mut opts = options(dir.path());
        opts.skip_tests = true;
        let report = Generator::new(opts, config()).run().unwrap();

        assert_eq!(report.total_built(), 1);
        assert_eq!(report.partitions[0].dropped, vec!["DevExpress.App"]);
        let reasons: Vec<_> = report.filtered.iter().map(|f| f.reason).collect();
        assert_eq!(reasons, vec![FilterReason::HardExcluded, FilterReason::Test]);
    }

    #[test]
    fn test_malformed_descriptor_skipped() {
        let dir = setup();
        write(dir.path(), "src/Bad/Bad.csproj", "<Project>");
        write(dir.path(), "src/Good/Good.csproj", &project(&[]));

        let report = Generator::new(options(dir.path()), config()).run().unwrap();
        assert_eq!(report.total_built(), 1);
        assert_eq!(report.skipped_descriptors.len(), 1);
    }

    #[test]
    fn test_folder_map_written() {
        let dir = setup();
        write(dir.path(), "src/Lib/DevExpress.Lib.csproj", &project(&[]));
        let mut opts = options(dir.path());
        opts.assembly_folders_file = Some(dir.path().join("folders.txt"));

        Generator::new(opts, config()).run().unwrap();
        let map = fs::read_to_string(dir.path().join("folders.txt")).unwrap();
        let expected = format!("DevExpress.Lib:{}\n", dir.path().join("src/Lib").display());
        assert_eq!(map, expected);
    }

    #[test]
    fn test_task_assembly_retargets_targets() {
        let dir = setup();
        write(dir.path(), "refs/DevExpress.Build.XamlResourceProcessing.v20.1.dll", "");
        write(
            dir.path(),
            "src/Build/Xaml.targets",
            r#"<Project><UsingTask TaskName="Process" AssemblyName="DevExpress.Build.XamlResourceProcessing.v20.1, Version=20.1.0.0" /></Project>"#,
        );

        let report = Generator::new(options(dir.path()), config()).run().unwrap();
        assert_eq!(report.retargeted.len(), 1);
        assert!(report.task_assembly.is_some());
        let targets = fs::read_to_string(dir.path().join("src/Build/Xaml.targets")).unwrap();
        assert!(targets.contains(
            r#"AssemblyFile="$(BuildTasksPath)\DevExpress.Build.XamlResourceProcessing.v20.1.dll""#
        ));
        assert_eq!(report.reference_files.len(), 1);
    }

    #[test]
    fn test_marker_files_match_any_case() {
        let dir = setup();
        let marker = "public const string PublicKeyToken = \"0000000000000000\";";
        write(dir.path(), "src/A/Properties/AssemblyInfo.cs", marker);
        write(dir.path(), "src/B/Properties/assemblyinfo.cs", marker);
        write(dir.path(), "src/C/Properties/ASSEMBLYINFO.CS", marker);
        write(dir.path(), "src/D/Properties/AssemblyInfo.cs", "// no markers");
        write(dir.path(), "src/E/Properties/VersionInfo.cs", marker);

        let report = Generator::new(options(dir.path()), config()).run().unwrap();
        let names: Vec<_> = report
            .patch_files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["AssemblyInfo.cs", "assemblyinfo.cs", "ASSEMBLYINFO.CS"]);
    }

    #[test]
    fn test_no_task_assembly_is_not_an_error() {
        let dir = setup();
        let report = Generator::new(options(dir.path()), config()).run().unwrap();
        assert!(report.task_assembly.is_none());
        assert!(report.retargeted.is_empty());
    }
}
