//! Build script template
//!
//! The template is an MSBuild project that carries the build logic; a run
//! fills in a few properties and appends item groups listing what to build.
//! Edits are spliced into the original text, so everything else in the
//! template survives byte for byte.

use crate::util::xml::{escape_attr, escape_text, start_tag_range, Splice};
use roxmltree::{Document, Node};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const INDENT: &str = "  ";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read template {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Template {} is not valid XML: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Property '{0}' not found in template")]
    PropertyNotFound(String),

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One item: `<Name Include="...">` with optional child metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub include: String,
    pub metadata: Vec<(String, String)>,
}

impl Item {
    pub fn new(include: impl Into<String>) -> Self {
        Self {
            include: include.into(),
            metadata: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, name: &str, value: impl Into<String>) -> Self {
        self.metadata.push((name.to_string(), value.into()));
        self
    }
}

/// An `<ItemGroup>` whose items all share one element name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemGroup {
    pub item_name: String,
    pub items: Vec<Item>,
}

impl ItemGroup {
    pub fn new(item_name: impl Into<String>) -> Self {
        Self {
            item_name: item_name.into(),
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, item: Item) {
        self.items.push(item);
    }

    fn render(&self, out: &mut String) {
        out.push_str(INDENT);
        if self.items.is_empty() {
            out.push_str("<ItemGroup />\n");
            return;
        }
        out.push_str("<ItemGroup>\n");
        for item in &self.items {
            let include = escape_attr(&item.include);
            if item.metadata.is_empty() {
                out.push_str(&format!(
                    "{0}{0}<{1} Include=\"{2}\" />\n",
                    INDENT, self.item_name, include
                ));
                continue;
            }
            out.push_str(&format!(
                "{0}{0}<{1} Include=\"{2}\">\n",
                INDENT, self.item_name, include
            ));
            for (name, value) in &item.metadata {
                out.push_str(&format!(
                    "{0}{0}{0}<{1}>{2}</{1}>\n",
                    INDENT,
                    name,
                    escape_text(value)
                ));
            }
            out.push_str(&format!("{0}{0}</{1}>\n", INDENT, self.item_name));
        }
        out.push_str(INDENT);
        out.push_str("</ItemGroup>\n");
    }
}

/// An MSBuild template with pending property values and item groups.
///
/// Nothing is written until [`Template::render`] or [`Template::write_to`];
/// both splice the pending edits into the original text.
///
/// # Example
///
/// ```
/// use buildgen::script::{Item, ItemGroup, Template};
/// use std::path::Path;
///
/// let text = "<Project>\n  <PropertyGroup>\n    <OutputPath />\n  </PropertyGroup>\n</Project>\n";
/// let mut template = Template::parse(Path::new("Template.proj"), text.to_string())?;
/// template.set_property("OutputPath", "bin")?;
///
/// let mut group = ItemGroup::new("ProjectToBuild");
/// group.push(Item::new("Grid.csproj"));
/// template.append_item_group(group);
///
/// let script = template.render()?;
/// assert!(script.contains("<OutputPath>bin</OutputPath>"));
/// assert!(script.contains(r#"Include="Grid.csproj""#));
/// # Ok::<(), buildgen::script::TemplateError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Template {
    path: PathBuf,
    text: String,
    properties: Vec<(String, String)>,
    groups: Vec<ItemGroup>,
}

fn parse<'a>(path: &Path, text: &'a str) -> Result<Document<'a>, TemplateError> {
    Document::parse(text).map_err(|e| TemplateError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// First element called `name` whose parent is a `PropertyGroup`.
fn find_property<'a, 'input>(doc: &'a Document<'input>, name: &str) -> Option<Node<'a, 'input>> {
    doc.root_element().descendants().find(|n| {
        n.is_element()
            && n.tag_name().name() == name
            && n.parent_element()
                .is_some_and(|p| p.tag_name().name() == "PropertyGroup")
    })
}

impl Template {
    /// Read and parse the template at `path`.
    ///
    /// # Errors
    ///
    /// [`TemplateError::NotFound`] when `path` is not a file,
    /// [`TemplateError::Read`] when it cannot be read and
    /// [`TemplateError::Parse`] when it is not well-formed XML.
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        if !path.is_file() {
            return Err(TemplateError::NotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path).map_err(|source| TemplateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, text)
    }

    pub fn parse(path: &Path, text: String) -> Result<Self, TemplateError> {
        parse(path, &text)?;
        Ok(Self {
            path: path.to_path_buf(),
            text,
            properties: Vec::new(),
            groups: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Set the value of a template property. Setting it again replaces the
    /// earlier value.
    ///
    /// # Arguments
    ///
    /// * `name` - Element name of the property; only elements directly inside a `PropertyGroup` count
    /// * `value` - Text content, escaped on render
    ///
    /// Returns [`TemplateError::PropertyNotFound`] when the template has no such property.
    pub fn set_property(&mut self, name: &str, value: &str) -> Result<(), TemplateError> {
        let doc = parse(&self.path, &self.text)?;
        if find_property(&doc, name).is_none() {
            return Err(TemplateError::PropertyNotFound(name.to_string()));
        }

        debug!(property = name, value, "Setting template property");
        match self.properties.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.properties.push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    /// Queue an item group for insertion before the root closing tag.
    pub fn append_item_group(&mut self, group: ItemGroup) {
        self.groups.push(group);
    }

    pub fn render(&self) -> Result<String, TemplateError> {
        let doc = parse(&self.path, &self.text)?;
        let mut splice = Splice::new();

        for (name, value) in &self.properties {
            let node = find_property(&doc, name)
                .ok_or_else(|| TemplateError::PropertyNotFound(name.clone()))?;
            let element = node.range();
            let tag = start_tag_range(&self.text, element.start).ok_or_else(|| {
                TemplateError::Parse {
                    path: self.path.clone(),
                    message: format!("Unterminated start tag for {}", name),
                }
            })?;
            let escaped = escape_text(value);
            if self.text[tag.clone()].ends_with("/>") {
                splice.replace(element, format!("<{0}>{1}</{0}>", name, escaped));
            } else {
                let close = self.text[..element.end]
                    .rfind("</")
                    .filter(|&pos| pos >= tag.end)
                    .unwrap_or(tag.end);
                splice.replace(tag.end..close, escaped);
            }
        }

        if !self.groups.is_empty() {
            let root = doc.root_element();
            let root_range = root.range();
            let root_tag = start_tag_range(&self.text, root_range.start).ok_or_else(|| {
                TemplateError::Parse {
                    path: self.path.clone(),
                    message: "Unterminated root start tag".to_string(),
                }
            })?;

            let mut rendered = String::new();
            for group in &self.groups {
                group.render(&mut rendered);
            }

            if self.text[root_tag.clone()].ends_with("/>") {
                let open = self.text[root_tag.start..root_tag.end - 2].trim_end();
                splice.replace(
                    root_tag,
                    format!("{}>\n{}</{}>", open, rendered, root.tag_name().name()),
                );
            } else {
                let close = self.text[..root_range.end]
                    .rfind("</")
                    .unwrap_or(root_range.end);
                // Keep the closing tag at the start of its own line.
                let line_start = self.text[..close].rfind('\n').map(|p| p + 1);
                match line_start {
                    Some(at) if self.text[at..close].trim().is_empty() => {
                        splice.insert(at, rendered)
                    }
                    _ => splice.insert(close, format!("\n{}", rendered)),
                }
            }
        }

        Ok(splice.apply(&self.text))
    }

    /// Render and write the whole script to `output`.
    pub fn write_to(&self, output: &Path) -> Result<(), TemplateError> {
        let rendered = self.render()?;
        fs::write(output, rendered).map_err(|source| TemplateError::Write {
            path: output.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEMPLATE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!-- build driver -->
<Project ToolsVersion="15.0" xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <PropertyGroup>
    <OutputPath></OutputPath>
    <DevExpressSourceDir>C:\old</DevExpressSourceDir>
    <TasksAssembly />
  </PropertyGroup>
  <Target Name="Build">
    <MSBuild Projects="@(ProjectToBuild)" />
  </Target>
</Project>
"#;

    fn template() -> Template {
        Template::parse(Path::new("Template.proj"), TEMPLATE.to_string()).unwrap()
    }

    #[test]
    fn test_set_property_replaces_value() {
        let mut t = template();
        t.set_property("DevExpressSourceDir", "/src/tree").unwrap();
        t.set_property("OutputPath", "bin & out").unwrap();
        let out = t.render().unwrap();
        assert!(out.contains("<DevExpressSourceDir>/src/tree</DevExpressSourceDir>"));
        assert!(out.contains("<OutputPath>bin &amp; out</OutputPath>"));
        assert!(out.contains("<!-- build driver -->"));
        assert!(out.contains(r#"<MSBuild Projects="@(ProjectToBuild)" />"#));
    }

    #[test]
    fn test_set_property_on_empty_element() {
        let mut t = template();
        t.set_property("TasksAssembly", "tools/buildgen").unwrap();
        let out = t.render().unwrap();
        assert!(out.contains("<TasksAssembly>tools/buildgen</TasksAssembly>"));
    }

    #[test]
    fn test_set_property_twice_keeps_last() {
        let mut t = template();
        t.set_property("OutputPath", "a").unwrap();
        t.set_property("OutputPath", "b").unwrap();
        let out = t.render().unwrap();
        assert!(out.contains("<OutputPath>b</OutputPath>"));
    }

    #[test]
    fn test_missing_property_is_error() {
        let mut t = template();
        let err = t.set_property("Nope", "x").unwrap_err();
        assert!(matches!(err, TemplateError::PropertyNotFound(ref n) if n == "Nope"));
    }

    #[test]
    fn test_property_outside_property_group_is_ignored() {
        let text = "<Project><Target Name=\"OutputPath\"><OutputPath /></Target></Project>";
        let mut t = Template::parse(Path::new("t.proj"), text.to_string()).unwrap();
        assert!(t.set_property("OutputPath", "x").is_err());
    }

    #[test]
    fn test_item_groups_inserted_before_root_close() {
        let mut t = template();
        let mut group = ItemGroup::new("ProjectToBuild");
        group.push(
            Item::new("$(DevExpressSourceDir)\\Grid\\Grid.csproj")
                .with_metadata("Platform", "Windows")
                .with_metadata("Product", "Xpf"),
        );
        t.append_item_group(group);
        let mut refs = ItemGroup::new("ReferenceFile");
        refs.push(Item::new("/refs/DevExpress.Data.dll"));
        t.append_item_group(refs);
        t.append_item_group(ItemGroup::new("PatchInternalsVisibleTo"));

        let out = t.render().unwrap();
        let expected = "  <ItemGroup>
    <ProjectToBuild Include=\"$(DevExpressSourceDir)\\Grid\\Grid.csproj\">
      <Platform>Windows</Platform>
      <Product>Xpf</Product>
    </ProjectToBuild>
  </ItemGroup>
  <ItemGroup>
    <ReferenceFile Include=\"/refs/DevExpress.Data.dll\" />
  </ItemGroup>
  <ItemGroup />
</Project>
";
        assert!(out.ends_with(expected), "unexpected output:\n{}", out);
        assert!(Document::parse(&out).is_ok());
    }

    #[test]
    fn test_groups_appended_to_self_closing_root() {
        let mut t = Template::parse(Path::new("t.proj"), "<Project />".to_string()).unwrap();
        let mut group = ItemGroup::new("ReferenceFile");
        group.push(Item::new("a.dll"));
        t.append_item_group(group);
        let out = t.render().unwrap();
        assert_eq!(
            out,
            "<Project>\n  <ItemGroup>\n    <ReferenceFile Include=\"a.dll\" />\n  </ItemGroup>\n</Project>"
        );
    }

    #[test]
    fn test_invalid_template() {
        let err = Template::parse(Path::new("t.proj"), "<Project>".to_string()).unwrap_err();
        assert!(matches!(err, TemplateError::Parse { .. }));
    }

    #[test]
    fn test_load_missing() {
        let err = Template::load(Path::new("/no/such/Template.proj")).unwrap_err();
        assert!(matches!(err, TemplateError::NotFound(_)));
    }

    #[test]
    fn test_write_to() {
        let dir = TempDir::new().unwrap();
        let mut t = template();
        t.set_property("OutputPath", "out").unwrap();
        let output = dir.path().join("build.proj");
        t.write_to(&output).unwrap();
        let written = fs::read_to_string(output).unwrap();
        assert!(written.contains("<OutputPath>out</OutputPath>"));
    }
}
