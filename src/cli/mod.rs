use std::path::{Path, PathBuf};

use clap::Parser;

use cppdoc::config::DEFAULT_CONFIG_FILE;
use cppdoc::{BuildOptions, BuildSummary, Config, DocBuilder, Result};

#[derive(Parser, Debug)]
#[command(name = "cppdoc")]
#[command(about = "Generates an API reference from C++ sources and headers")]
#[command(version)]
#[command(after_long_help = r#"
EXAMPLES:
    # Use ./cppdoc.toml
    cppdoc

    # Layer two configuration files and override the output directory
    cppdoc -f base.toml -f local.toml -D cppdoc.output=build/doc

    # Also write an Eclipse table of contents and a search index
    cppdoc -f cppdoc.toml --eclipse --search-index
"#)]
pub struct Cli {
    /// Configuration file; may be given more than once, later files win
    #[arg(short = 'f', long = "config", value_name = "FILE")]
    pub config: Vec<PathBuf>,

    /// Set a configuration property
    #[arg(short = 'D', long = "define", value_name = "NAME=VALUE")]
    pub define: Vec<String>,

    /// Write an Eclipse TOC file
    #[arg(short = 'e', long)]
    pub eclipse: bool,

    /// Write a full-text search index
    #[arg(short = 's', long = "search-index")]
    pub search_index: bool,
}

impl Cli {
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            eclipse_toc: self.eclipse,
            search_index: self.search_index,
        }
    }
}

/// Loads the given configuration files in order, or `cppdoc.toml` from the
/// working directory when none are given, then applies the definitions.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::new();

    if cli.config.is_empty() {
        let default = Path::new(DEFAULT_CONFIG_FILE);
        if default.is_file() {
            tracing::debug!("Loading {}", default.display());
            config.load_file(default)?;
        }
    }
    for path in &cli.config {
        tracing::debug!("Loading {}", path.display());
        config.load_file(path)?;
    }
    for definition in &cli.define {
        config.define(definition)?;
    }

    Ok(config)
}

pub fn run(cli: &Cli) -> Result<BuildSummary> {
    let config = load_config(cli)?;
    DocBuilder::new(config, cli.build_options()).run()
}
