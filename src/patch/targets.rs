//! Retargets `UsingTask` declarations at the build task assembly shipped with
//! the references, so the generated build does not depend on an installed copy.

use crate::util::xml::{attribute_range, escape_attr, start_tag_range, Splice};
use roxmltree::Document;

/// Rewrite every matching `UsingTask` to load `task_path`. Returns `None`
/// when the document is not XML.
pub fn retarget_using_tasks(text: &str, task_prefix: &str, task_path: &str) -> Option<String> {
    let doc = Document::parse(text).ok()?;
    let prefix = task_prefix.to_lowercase();
    let mut splice = Splice::new();

    for node in doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "UsingTask")
    {
        let (attr_name, value) = match node
            .attribute("AssemblyName")
            .map(|v| ("AssemblyName", v))
            .or_else(|| node.attribute("AssemblyFile").map(|v| ("AssemblyFile", v)))
        {
            Some(found) => found,
            None => continue,
        };

        if !file_name(value).to_lowercase().starts_with(&prefix) {
            continue;
        }

        let Some(tag) = start_tag_range(text, node.range().start) else {
            continue;
        };
        if let Some(range) = attribute_range(text, tag, attr_name) {
            splice.replace(range, format!("AssemblyFile=\"{}\"", escape_attr(task_path)));
        }
    }

    if splice.is_empty() {
        return Some(text.to_string());
    }
    Some(splice.apply(text))
}

fn file_name(value: &str) -> &str {
    value.rsplit(['/', '\\']).next().unwrap_or(value)
}
