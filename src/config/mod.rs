//! Layered configuration store
//!
//! TOML files are merged in load order and `name=value` definitions from the
//! command line are applied on top. Keys are dotted paths into the merged
//! table, e.g. `cppdoc.compiler.unix.exec`.

use std::path::Path;

use toml::{Table, Value};

use crate::error::{DocError, Result};

/// Prefix shared by every key the builder reads.
pub const PREFIX: &str = "cppdoc";

/// Configuration file loaded when none is given explicitly.
pub const DEFAULT_CONFIG_FILE: &str = "cppdoc.toml";

#[derive(Debug, Clone, Default)]
pub struct Config {
    root: Table,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a TOML file and merges it over the current values.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DocError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        self.merge_str(&content)
    }

    pub fn merge_str(&mut self, content: &str) -> Result<()> {
        let table: Table = content.parse()?;
        merge_tables(&mut self.root, table);
        Ok(())
    }

    /// Applies a `name=value` definition. A definition without `=` sets an empty value.
    pub fn define(&mut self, definition: &str) -> Result<()> {
        let (name, value) = match definition.split_once('=') {
            Some((name, value)) => (name.trim(), value),
            None => (definition.trim(), ""),
        };
        self.set_string(name, value)
    }

    pub fn set_string(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        let segments: Vec<&str> = key.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(DocError::Config(format!("invalid property name `{}`", key)));
        }

        let (leaf, parents) = segments
            .split_last()
            .ok_or_else(|| DocError::Config("empty property name".to_string()))?;

        insert_path(&mut self.root, parents, leaf, Value::String(value.into()));
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut segments = key.split('.');
        let mut current = self.root.get(segments.next()?)?;
        for segment in segments {
            current = current.as_table()?.get(segment)?;
        }
        Some(current)
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns a scalar as a string; arrays are joined with `,`. Tables have no string form.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(value_to_string)
    }

    pub fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|| default.to_string())
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Boolean(b)) => Ok(Some(*b)),
            Some(Value::Integer(i)) => Ok(Some(*i != 0)),
            Some(Value::String(s)) => parse_bool(s)
                .map(Some)
                .ok_or_else(|| DocError::Config(format!("`{}` is not a boolean: {}", key, s))),
            Some(other) => Err(DocError::Config(format!(
                "`{}` is not a boolean: {}",
                key, other
            ))),
        }
    }

    /// Returns a list value. Strings are split on `,` and newlines; empty tokens are dropped.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(value_to_string)
                .flat_map(|s| split_list(&s))
                .collect(),
            Some(value) => value_to_string(value)
                .map(|s| split_list(&s))
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }
}

/// Tokenizes a list on `,` and newlines, trimming each token and dropping empty ones.
/// Stores `value` under `parents`, replacing any scalar found on the way by a table.
fn insert_path(table: &mut Table, parents: &[&str], leaf: &str, value: Value) {
    let Some((segment, rest)) = parents.split_first() else {
        table.insert(leaf.to_string(), value);
        return;
    };
    match table
        .entry(segment.to_string())
        .or_insert_with(|| Value::Table(Table::new()))
    {
        Value::Table(child) => insert_path(child, rest, leaf, value),
        slot => {
            let mut child = Table::new();
            insert_path(&mut child, rest, leaf, value);
            *slot = Value::Table(child);
        }
    }
}

pub fn split_list(value: &str) -> Vec<String> {
    value
        .split([',', '\n'])
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect()
}

/// Name used to select platform-specific keys.
pub fn platform_name() -> &'static str {
    if cfg!(windows) {
        "windows"
    } else {
        "unix"
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        Value::Datetime(d) => Some(d.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(value_to_string)
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Table(_) => None,
    }
}

fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(existing)), Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_dotted_lookup() {
        let mut config = Config::new();
        config
            .merge_str(
                r#"
[cppdoc.compiler]
exec = "cc"
usePipe = true

[cppdoc.compiler.unix]
exec = "gcc"
"#,
            )
            .unwrap();

        assert_eq!(config.get_string("cppdoc.compiler.exec").as_deref(), Some("cc"));
        assert_eq!(config.get_string("cppdoc.compiler.unix.exec").as_deref(), Some("gcc"));
        assert_eq!(config.get_bool("cppdoc.compiler.usePipe").unwrap(), Some(true));
        assert!(config.has("cppdoc.compiler.unix"));
        assert!(!config.has("cppdoc.compiler.windows.exec"));
    }

    #[test]
    fn test_later_files_override_earlier() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("first.toml");
        let second = temp_dir.path().join("second.toml");
        fs::write(&first, "[cppdoc]\noutput = \"doc\"\nprettifyCode = true\n").unwrap();
        fs::write(&second, "[cppdoc]\noutput = \"html\"\n").unwrap();

        let mut config = Config::new();
        config.load_file(&first).unwrap();
        config.load_file(&second).unwrap();

        assert_eq!(config.get_string_or("cppdoc.output", "x"), "html");
        assert_eq!(config.get_bool("cppdoc.prettifyCode").unwrap(), Some(true));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let mut config = Config::new();
        let err = config.load_file("/nonexistent/cppdoc.toml").unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_define_overrides_and_creates_tables() {
        let mut config = Config::new();
        config.merge_str("[cppdoc]\noutput = \"doc\"\n").unwrap();
        config.define("cppdoc.output=out/html").unwrap();
        config.define("cppdoc.compiler.unix.path=/opt/bin").unwrap();
        config.define("cppdoc.flag").unwrap();

        assert_eq!(config.get_string("cppdoc.output").as_deref(), Some("out/html"));
        assert_eq!(config.get_string("cppdoc.compiler.unix.path").as_deref(), Some("/opt/bin"));
        assert_eq!(config.get_string("cppdoc.flag").as_deref(), Some(""));
    }

    #[test]
    fn test_define_keeps_everything_after_first_equals() {
        let mut config = Config::new();
        config.define("cppdoc.compiler.options=-DVALUE=1").unwrap();
        assert_eq!(
            config.get_string("cppdoc.compiler.options").as_deref(),
            Some("-DVALUE=1")
        );
    }

    #[test]
    fn test_define_replaces_scalar_parent() {
        let mut config = Config::new();
        config.define("cppdoc.output=doc").unwrap();
        config.define("cppdoc.output.dir=html").unwrap();
        assert_eq!(config.get_string("cppdoc.output.dir").as_deref(), Some("html"));
    }

    #[test]
    fn test_define_replaces_scalar_above_nested_tables() {
        let mut config = Config::new();
        config.merge_str("[cppdoc]\ncompiler = \"cc\"\noutput = \"doc\"\n").unwrap();
        config.define("cppdoc.compiler.linux.exec=gcc").unwrap();

        assert_eq!(config.get_string("cppdoc.compiler.linux.exec").as_deref(), Some("gcc"));
        assert_eq!(config.get_string("cppdoc.output").as_deref(), Some("doc"));
        assert!(config.get("cppdoc.compiler").unwrap().is_table());
    }

    #[test]
    fn test_define_rejects_empty_segments() {
        let mut config = Config::new();
        assert!(config.define("cppdoc..exec=cc").is_err());
        assert!(config.define("=value").is_err());
    }

    #[test]
    fn test_get_list_from_string_and_array() {
        let mut config = Config::new();
        config
            .merge_str(
                r#"
[cppdoc.files]
include = " src/*.h, include/*.h ,,\n extra/*.hpp "
exclude = ["*_impl.h", "internal/*, detail/*"]
"#,
            )
            .unwrap();

        assert_eq!(
            config.get_list("cppdoc.files.include"),
            vec!["src/*.h", "include/*.h", "extra/*.hpp"]
        );
        assert_eq!(
            config.get_list("cppdoc.files.exclude"),
            vec!["*_impl.h", "internal/*", "detail/*"]
        );
        assert!(config.get_list("cppdoc.pages").is_empty());
    }

    #[test]
    fn test_get_bool_accepts_strings() {
        let mut config = Config::new();
        config.define("a.yes=yes").unwrap();
        config.define("a.off=off").unwrap();
        config.define("a.bad=maybe").unwrap();

        assert_eq!(config.get_bool("a.yes").unwrap(), Some(true));
        assert_eq!(config.get_bool("a.off").unwrap(), Some(false));
        assert_eq!(config.get_bool("a.none").unwrap(), None);
        assert!(config.get_bool("a.bad").unwrap_err().is_config());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let mut config = Config::new();
        let err = config.merge_str("[cppdoc\n").unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("-E, -C,\n-I/usr/include"), vec!["-E", "-C", "-I/usr/include"]);
        assert!(split_list(" , \n ").is_empty());
    }
}
