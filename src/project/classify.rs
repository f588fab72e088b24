use super::descriptor::ProjectDescriptor;
use super::{Platform, ProjectTraits};
use std::path::Path;

const TEST_PROJECT_TYPE: &str = "3AC096D0-A1C2-E12C-1390-A8335801FDAB";
const WINRT_PROJECT_TYPE: &str = "BC8A1FFA-BEE3-4634-8014-F334798102B3";
const WINRT_INTERMEDIATE_PATH: &str = "obj.RT";
const MVC_REFERENCE_PREFIX: &str = "system.web.mvc";
const CODED_UI_PREFIX: &str = "CodedUIExtension";
const LEGACY_FRAMEWORK_HINT: &str = "v4.6";

pub const PRODUCT_HINT: &str = "Xpf";

fn contains_project_type(project_types: &str, guid: &str) -> bool {
    project_types.to_uppercase().contains(guid)
}

/// Classify one project. Never fails; unknown metadata yields defaults.
pub fn classify(descriptor: &ProjectDescriptor, product_folder: &str) -> ProjectTraits {
    let project_types = descriptor.property("ProjectTypeGuids");

    let is_test = contains_project_type(project_types, TEST_PROJECT_TYPE)
        || descriptor.property("IsTestProject").eq_ignore_ascii_case("true");

    let is_restricted_platform = contains_project_type(project_types, WINRT_PROJECT_TYPE)
        || descriptor
            .property("BaseIntermediateOutputPath")
            .eq_ignore_ascii_case(WINRT_INTERMEDIATE_PATH);

    let is_web_framework = descriptor.references.iter().any(|r| {
        r.kind == super::ReferenceKind::Assembly
            && r.include.to_lowercase().starts_with(MVC_REFERENCE_PREFIX)
    });

    let is_ui_automation = descriptor
        .path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(CODED_UI_PREFIX));

    let (platform, framework_version) = platform_and_framework(target_framework(descriptor));

    let product = in_product_folder(&descriptor.path, product_folder).then(|| PRODUCT_HINT.to_string());

    ProjectTraits {
        platform,
        framework_version,
        product,
        is_test,
        is_ui_automation,
        is_web_framework,
        is_restricted_platform,
    }
}

fn target_framework(descriptor: &ProjectDescriptor) -> &str {
    match descriptor.property("TargetFramework") {
        "" => descriptor
            .property("TargetFrameworks")
            .split(';')
            .map(str::trim)
            .find(|tfm| !tfm.is_empty())
            .unwrap_or(""),
        tfm => tfm,
    }
}

/// Map a target framework moniker to its platform partition.
pub fn platform_and_framework(target_framework: &str) -> (Platform, Option<String>) {
    let tfm = target_framework.trim().to_lowercase();

    if tfm.starts_with("netstandard") {
        return (Platform::Standard, None);
    }
    if tfm.starts_with("netcoreapp") {
        return (Platform::NetCore, None);
    }
    if let Some(version) = tfm.strip_prefix("net") {
        let digits: String = version.chars().take_while(|c| c.is_ascii_digit()).collect();
        if !digits.is_empty() {
            // net5.0 and later are dotted, .NET Framework monikers (net48, net472) are not.
            let dotted = version[digits.len()..].starts_with('.');
            return if dotted {
                (Platform::NetCore, None)
            } else {
                (Platform::Windows, None)
            };
        }
    }
    (Platform::Windows, Some(LEGACY_FRAMEWORK_HINT.to_string()))
}

fn in_product_folder(path: &Path, product_folder: &str) -> bool {
    if product_folder.is_empty() {
        return false;
    }
    let Some(parent) = path.parent() else {
        return false;
    };
    parent.iter().any(|component| {
        component
            .to_str()
            .is_some_and(|c| c.eq_ignore_ascii_case(product_folder))
    })
}
