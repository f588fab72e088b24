//! Dependency resolution across platform partitions

pub mod name_set;
pub mod resolver;

pub use name_set::NameSet;
pub use resolver::{resolve, CycleEdge, Resolution};

use crate::project::{Platform, Unit};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Resolutions keyed by platform, iterated in build order.
pub type Partitions = BTreeMap<Platform, Resolution>;

/// Partition `units` by platform and resolve each partition in turn.
///
/// Partitions are resolved in platform order. Units dropped in one partition
/// join the excluded set of the partitions after it, so a project that
/// references an excluded project of another platform is dropped as well.
/// References never resolve across partitions.
///
/// # Arguments
///
/// * `units` - Classified units in discovery order
/// * `excluded` - Names filtered out before resolution (tests, web projects, ...)
/// * `vendor_prefix` - Prefix of references collected as external, matched case-insensitively
///
/// # Example
///
/// ```
/// use buildgen::graph::{resolve_partitions, NameSet};
/// use buildgen::project::{Platform, Unit};
///
/// let units = vec![
///     Unit::new("Grid", "Grid/Grid.csproj")
///         .with_platform(Platform::Windows)
///         .with_references(["Data", "DevExpress.Drawing"]),
///     Unit::new("Data", "Data/Data.csproj").with_platform(Platform::Windows),
///     Unit::new("Tests", "Tests/Tests.csproj")
///         .with_platform(Platform::Windows)
///         .with_references(["Grid", "Excluded.Helpers"]),
/// ];
/// let excluded: NameSet = ["Excluded.Helpers"].into_iter().collect();
///
/// let partitions = resolve_partitions(&units, &excluded, "DevExpress");
/// let windows = &partitions[&Platform::Windows];
/// assert_eq!(windows.names(), vec!["Data", "Grid"]);
/// assert_eq!(windows.dropped, vec!["Tests"]);
/// assert!(windows.external_refs.contains("DevExpress.Drawing"));
/// ```
pub fn resolve_partitions(units: &[Unit], excluded: &NameSet, vendor_prefix: &str) -> Partitions {
    let mut grouped: BTreeMap<Platform, Vec<Unit>> = BTreeMap::new();
    for unit in units {
        grouped.entry(unit.platform()).or_default().push(unit.clone());
    }

    let mut excluded = excluded.clone();
    let mut partitions = Partitions::new();
    for (platform, members) in grouped {
        let resolution = resolve(&members, &excluded, vendor_prefix);
        info!(
            platform = %platform,
            units = members.len(),
            ordered = resolution.ordered.len(),
            dropped = resolution.dropped.len(),
            external = resolution.external_refs.len(),
            "Resolved partition"
        );
        if !resolution.cycles.is_empty() {
            debug!(platform = %platform, cycles = resolution.cycles.len(), "Cycles absorbed");
        }
        excluded.extend(resolution.dropped.iter().map(String::as_str));
        partitions.insert(platform, resolution);
    }
    partitions
}

/// External references of every partition, deduplicated.
pub fn external_refs(partitions: &Partitions) -> NameSet {
    let mut all = NameSet::new();
    for resolution in partitions.values() {
        all.merge(&resolution.external_refs);
    }
    all
}
