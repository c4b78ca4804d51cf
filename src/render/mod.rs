pub mod json;
#[cfg(feature = "search-index")]
pub mod search;

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::Result;
use crate::symbols::SymbolTable;

pub use json::JsonRenderer;

pub const OUTPUT_KEY: &str = "cppdoc.output";
pub const PRETTIFY_KEY: &str = "cppdoc.prettifyCode";
pub const SEARCH_INDEX_KEY: &str = "cppdoc.searchIndex";
pub const DEFAULT_OUTPUT_DIR: &str = "doc";

/// Whether this build can write a search index.
pub const SEARCH_INDEX_SUPPORTED: bool = cfg!(feature = "search-index");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub output_dir: PathBuf,
    pub prettify: bool,
    pub eclipse_toc: bool,
    pub search_index: bool,
}

impl RenderOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            prettify: false,
            eclipse_toc: false,
            search_index: false,
        }
    }

    /// Reads output directory, prettify and search index settings. The
    /// search index is on when either `search_index` or the config asks for it.
    pub fn from_config(config: &Config, eclipse_toc: bool, search_index: bool) -> Result<Self> {
        Ok(Self {
            output_dir: PathBuf::from(config.get_string_or(OUTPUT_KEY, DEFAULT_OUTPUT_DIR)),
            prettify: config.get_bool(PRETTIFY_KEY)?.unwrap_or(false),
            eclipse_toc,
            search_index: search_index || config.get_bool(SEARCH_INDEX_KEY)?.unwrap_or(false),
        })
    }
}

/// Consumes the finished symbol table.
pub trait Renderer {
    /// Adds a free-standing documentation page.
    fn add_page(&mut self, path: &Path) -> Result<()>;

    fn write(&mut self, table: &SymbolTable) -> Result<()>;

    fn write_eclipse_toc(&mut self, table: &SymbolTable) -> Result<()>;
}
