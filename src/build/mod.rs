//! One documentation run
//!
//! Resolve the file set, preprocess and parse every file into one table,
//! fix up class hierarchies, then hand the table to the renderer.

pub mod coordinator;
pub mod hierarchy;

use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::Result;
use crate::files::{self, GlobFileSet, ResolvedFileSet};
use crate::parser::{CppParser, SourceParser};
use crate::preprocess::{Preprocessor, ToolConfig};
use crate::render::{JsonRenderer, RenderOptions, Renderer, SEARCH_INDEX_SUPPORTED};
use crate::symbols::SymbolTable;

pub use coordinator::{BuildStats, ParseCoordinator};
pub use hierarchy::{ancestors, fixup, inherited_members};

pub const PAGES_KEY: &str = "cppdoc.pages";

/// Switches given on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    pub eclipse_toc: bool,
    pub search_index: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub stats: BuildStats,
    pub pages: usize,
    pub elapsed: Duration,
}

pub struct DocBuilder {
    config: Config,
    options: BuildOptions,
}

impl DocBuilder {
    pub fn new(config: Config, options: BuildOptions) -> Self {
        Self { config, options }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the whole pipeline with the tree-sitter parser and the JSON renderer.
    pub fn run(&self) -> Result<BuildSummary> {
        let parser = CppParser::from_config(&self.config)?;
        let render_options = RenderOptions::from_config(
            &self.config,
            self.options.eclipse_toc,
            self.options.search_index,
        )?;
        self.run_with(parser, JsonRenderer::new, render_options)
    }

    /// Runs the pipeline with a custom parser and renderer.
    ///
    /// Configuration problems fail before the first file is touched. Errors
    /// in single files are counted and reported in the summary.
    pub fn run_with<P, R, F>(
        &self,
        parser: P,
        make_renderer: F,
        mut render_options: RenderOptions,
    ) -> Result<BuildSummary>
    where
        P: SourceParser,
        R: Renderer,
        F: FnOnce(RenderOptions) -> R,
    {
        let started = Instant::now();

        let files = GlobFileSet::from_config(&self.config)?.resolve()?;
        let tool = ToolConfig::from_config(&self.config)?;
        let pages = files::expand(&self.config.get_list(PAGES_KEY))?;
        tracing::info!("{} files to process", files.len());

        let (mut table, stats) = self.parse_all(&files, Preprocessor::new(tool), parser);

        tracing::info!("Fixing-up class hierarchies");
        fixup(&mut table);

        if render_options.search_index && !SEARCH_INDEX_SUPPORTED {
            tracing::error!("Search index support is not compiled in, search is disabled");
            render_options.search_index = false;
        }
        let eclipse_toc = render_options.eclipse_toc;
        let mut renderer = make_renderer(render_options);
        write_doc(&mut renderer, &table, &pages, eclipse_toc)?;

        let elapsed = started.elapsed();
        tracing::info!("{} errors.", stats.errors);
        tracing::info!("Time: {}", format_elapsed(elapsed));

        Ok(BuildSummary {
            stats,
            pages: pages.len(),
            elapsed,
        })
    }

    fn parse_all<P: SourceParser>(
        &self,
        files: &ResolvedFileSet,
        preprocessor: Preprocessor,
        parser: P,
    ) -> (SymbolTable, BuildStats) {
        ParseCoordinator::new(preprocessor, parser).run(files)
    }
}

fn write_doc<R: Renderer>(
    renderer: &mut R,
    table: &SymbolTable,
    pages: &ResolvedFileSet,
    eclipse_toc: bool,
) -> Result<()> {
    tracing::info!("Generating documentation");
    for page in pages {
        renderer.add_page(page)?;
    }
    renderer.write(table)?;
    if eclipse_toc {
        renderer.write_eclipse_toc(table)?;
    }
    Ok(())
}

/// `HH:MM:SS.mmm`
pub fn format_elapsed(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        millis / 3_600_000,
        millis / 60_000 % 60,
        millis / 1000 % 60,
        millis % 1000
    )
}
