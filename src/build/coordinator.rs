use std::path::Path;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::files::ResolvedFileSet;
use crate::parser::SourceParser;
use crate::preprocess::Preprocessor;
use crate::symbols::SymbolTable;

/// Counters of one parse pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub files: usize,
    pub errors: usize,
    pub entries: usize,
    pub elapsed: Duration,
}

/// Runs every resolved file through the preprocessor and the parser,
/// accumulating into one symbol table.
pub struct ParseCoordinator<P: SourceParser> {
    preprocessor: Preprocessor,
    parser: P,
    table: SymbolTable,
}

impl<P: SourceParser> ParseCoordinator<P> {
    pub fn new(preprocessor: Preprocessor, parser: P) -> Self {
        Self::with_table(preprocessor, parser, SymbolTable::new())
    }

    /// Continues filling an existing table.
    pub fn with_table(preprocessor: Preprocessor, parser: P, table: SymbolTable) -> Self {
        Self {
            preprocessor,
            parser,
            table,
        }
    }

    /// Processes `files` in order. A failure in one file is logged and
    /// counted; the remaining files are still processed.
    pub fn run(mut self, files: &ResolvedFileSet) -> (SymbolTable, BuildStats) {
        let started = Instant::now();
        let mut stats = BuildStats::default();

        for file in files {
            stats.files += 1;
            if let Err(e) = self.parse_file(file) {
                tracing::error!("{}: {}", file.display(), e);
                stats.errors += 1;
            }
        }

        stats.entries = self.table.len();
        stats.elapsed = started.elapsed();
        (self.table, stats)
    }

    fn parse_file(&mut self, file: &Path) -> Result<()> {
        tracing::info!("Preprocessing {}", file.display());
        let mut job = self.preprocessor.run(file)?;

        tracing::info!("Parsing {}", file.display());
        self.parser.parse(&mut self.table, file, job.stream())
    }
}
