//! JSON reference output
//!
//! `index.json` holds every entry with its inherited members and ancestors
//! already resolved, plus the free-standing pages. `toc.xml` is an Eclipse
//! help table of contents over the namespace and class tree.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::build::hierarchy::{ancestors, inherited_members};
use crate::error::{DocError, Result};
use crate::render::{RenderOptions, Renderer};
use crate::symbols::{SymbolEntry, SymbolTable};

pub const INDEX_FILE: &str = "index.json";
pub const TOC_FILE: &str = "toc.xml";

#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub title: String,
    pub source: String,
    pub content: String,
}

#[derive(Serialize)]
struct Document<'a> {
    generator: &'static str,
    version: &'static str,
    pages: &'a [Page],
    entries: Vec<EntryView<'a>>,
}

#[derive(Serialize)]
struct EntryView<'a> {
    key: &'a str,
    #[serde(flatten)]
    entry: &'a SymbolEntry,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    ancestors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    inherited: Vec<String>,
}

pub struct JsonRenderer {
    options: RenderOptions,
    pages: Vec<Page>,
}

impl JsonRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            pages: Vec::new(),
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    fn output_path(&self, name: &str) -> PathBuf {
        self.options.output_dir.join(name)
    }

    fn toc_label(&self) -> String {
        self.options
            .output_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Reference".to_string())
    }

    #[cfg(feature = "search-index")]
    fn write_search_index(&self, table: &SymbolTable) -> Result<()> {
        super::search::write_index(&self.options.output_dir, table, &self.pages)
    }

    #[cfg(not(feature = "search-index"))]
    fn write_search_index(&self, _table: &SymbolTable) -> Result<()> {
        Err(DocError::Render(
            "search index support is not compiled in".to_string(),
        ))
    }

    fn create_output_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.options.output_dir).map_err(|e| {
            DocError::Render(format!(
                "cannot create {}: {}",
                self.options.output_dir.display(),
                e
            ))
        })
    }
}

impl Renderer for JsonRenderer {
    fn add_page(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path)?;
        let title = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.pages.push(Page {
            title,
            source: path.display().to_string(),
            content,
        });
        Ok(())
    }

    fn write(&mut self, table: &SymbolTable) -> Result<()> {
        self.create_output_dir()?;

        let entries = table
            .iter()
            .map(|(key, entry)| {
                let (lineage, inherited) = if entry.is_struct() {
                    (ancestors(table, key), inherited_members(table, key))
                } else {
                    (Vec::new(), Vec::new())
                };
                EntryView {
                    key,
                    entry,
                    ancestors: lineage,
                    inherited,
                }
            })
            .collect();

        let document = Document {
            generator: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            pages: &self.pages,
            entries,
        };

        let path = self.output_path(INDEX_FILE);
        let mut writer = BufWriter::new(fs::File::create(&path)?);
        if self.options.prettify {
            serde_json::to_writer_pretty(&mut writer, &document)?;
        } else {
            serde_json::to_writer(&mut writer, &document)?;
        }
        writer.write_all(b"\n")?;
        writer.flush()?;
        tracing::debug!("Wrote {}", path.display());

        if self.options.search_index {
            self.write_search_index(table)?;
        }
        Ok(())
    }

    fn write_eclipse_toc(&mut self, table: &SymbolTable) -> Result<()> {
        self.create_output_dir()?;

        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str("<?NLS TYPE=\"org.eclipse.help.toc\"?>\n");
        xml.push_str(&format!(
            "<toc label=\"{}\" topic=\"{}\">\n",
            escape_xml(&self.toc_label()),
            INDEX_FILE
        ));

        for page in &self.pages {
            xml.push_str(&format!(
                "  <topic label=\"{}\" href=\"{}#page:{}\"/>\n",
                escape_xml(&page.title),
                INDEX_FILE,
                escape_xml(&page.title)
            ));
        }

        let roots = table
            .iter()
            .filter(|(_, entry)| entry.scope.is_none() && entry.is_scope());
        for (key, _) in roots {
            write_topic(&mut xml, table, key, 1);
        }
        xml.push_str("</toc>\n");

        let path = self.output_path(TOC_FILE);
        fs::write(&path, xml)?;
        tracing::debug!("Wrote {}", path.display());
        Ok(())
    }
}

fn write_topic(xml: &mut String, table: &SymbolTable, key: &str, depth: usize) {
    let entry = match table.get(key) {
        Some(entry) => entry,
        None => return,
    };
    let indent = "  ".repeat(depth);
    let children: Vec<&String> = entry
        .members
        .iter()
        .filter(|member| table.get(member).is_some_and(|m| m.is_scope()))
        .collect();

    let open = format!(
        "{}<topic label=\"{}\" href=\"{}#{}\"",
        indent,
        escape_xml(&entry.qualified_name),
        INDEX_FILE,
        escape_xml(key)
    );
    if children.is_empty() {
        xml.push_str(&open);
        xml.push_str("/>\n");
        return;
    }

    xml.push_str(&open);
    xml.push_str(">\n");
    for child in children {
        write_topic(xml, table, child, depth + 1);
    }
    xml.push_str(&indent);
    xml.push_str("</topic>\n");
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::hierarchy::fixup;
    use crate::symbols::{Access, BaseRef, EntryKind, Location, StructInfo, StructKeyword};
    use tempfile::TempDir;

    fn sample_table() -> SymbolTable {
        let mut table = SymbolTable::new();
        table.merge(SymbolEntry::new("Poco", None, Location::new("a.h", 1), EntryKind::Namespace));
        for (name, bases) in [("Base", vec![]), ("Derived", vec!["Base"])] {
            let entry = SymbolEntry::new(
                name,
                Some("Poco"),
                Location::new("a.h", 2),
                EntryKind::Struct(StructInfo {
                    keyword: StructKeyword::Class,
                    bases: bases
                        .into_iter()
                        .map(|b| BaseRef::new(b, Access::Public, false))
                        .collect(),
                    derived: Vec::new(),
                }),
            )
            .with_doc(Some(format!("The {} <class>.", name)));
            let key = entry.key();
            table.merge(entry);
            table.add_member("Poco", &key);
        }
        fixup(&mut table);
        table
    }

    #[test]
    fn test_write_index_json() {
        let dir = TempDir::new().unwrap();
        let mut renderer = JsonRenderer::new(RenderOptions::new(dir.path().join("doc")));
        let table = sample_table();

        renderer.write(&table).unwrap();

        let content = fs::read_to_string(dir.path().join("doc").join(INDEX_FILE)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();
        let entries = json["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 3);

        let derived = entries.iter().find(|e| e["key"] == "Poco::Derived").unwrap();
        assert_eq!(derived["kind"], "struct");
        assert_eq!(derived["keyword"], "class");
        assert_eq!(derived["ancestors"][0], "Poco::Base");
        assert_eq!(derived["bases"][0]["link"]["key"], "Poco::Base");
    }

    #[test]
    fn test_pages_are_included() {
        let dir = TempDir::new().unwrap();
        let page = dir.path().join("Overview.page");
        fs::write(&page, "Welcome").unwrap();

        let mut options = RenderOptions::new(dir.path().join("doc"));
        options.prettify = true;
        let mut renderer = JsonRenderer::new(options);
        renderer.add_page(&page).unwrap();
        renderer.write(&SymbolTable::new()).unwrap();

        let content = fs::read_to_string(dir.path().join("doc").join(INDEX_FILE)).unwrap();
        assert!(content.contains("\n  \"pages\""));
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json["pages"][0]["title"], "Overview");
        assert_eq!(json["pages"][0]["content"], "Welcome");
    }

    #[test]
    fn test_missing_page_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut renderer = JsonRenderer::new(RenderOptions::new(dir.path()));
        assert!(renderer.add_page(&dir.path().join("nope.page")).is_err());
    }

    #[test]
    fn test_eclipse_toc_nests_scopes() {
        let dir = TempDir::new().unwrap();
        let mut renderer = JsonRenderer::new(RenderOptions::new(dir.path().join("doc")));

        renderer.write_eclipse_toc(&sample_table()).unwrap();

        let toc = fs::read_to_string(dir.path().join("doc").join(TOC_FILE)).unwrap();
        assert!(toc.starts_with("<?xml"));
        assert!(toc.contains("<toc label=\"doc\" topic=\"index.json\">"));
        assert!(toc.contains("  <topic label=\"Poco\" href=\"index.json#Poco\">"));
        assert!(toc.contains("    <topic label=\"Poco::Base\" href=\"index.json#Poco::Base\"/>"));
        assert!(toc.trim_end().ends_with("</toc>"));
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a<b> & \"c\""), "a&lt;b&gt; &amp; &quot;c&quot;");
    }
}
