use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::config::Config;
use crate::error::{DocError, Result};

pub const INCLUDE_KEY: &str = "cppdoc.files.include";
pub const EXCLUDE_KEY: &str = "cppdoc.files.exclude";

/// Role a glob pattern plays in file selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternRole {
    Include,
    Exclude,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePattern {
    pub glob: String,
    pub role: PatternRole,
}

impl FilePattern {
    pub fn include(glob: impl Into<String>) -> Self {
        Self {
            glob: glob.into(),
            role: PatternRole::Include,
        }
    }

    pub fn exclude(glob: impl Into<String>) -> Self {
        Self {
            glob: glob.into(),
            role: PatternRole::Exclude,
        }
    }
}

/// Sorted, deduplicated absolute file paths taking part in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedFileSet {
    files: Vec<PathBuf>,
}

impl ResolvedFileSet {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.files.iter()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.binary_search_by(|p| p.as_path().cmp(path)).is_ok()
    }

    pub fn as_slice(&self) -> &[PathBuf] {
        &self.files
    }
}

impl FromIterator<PathBuf> for ResolvedFileSet {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        let set: BTreeSet<PathBuf> = iter.into_iter().collect();
        Self {
            files: set.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ResolvedFileSet {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

/// Include/exclude glob rules.
#[derive(Debug, Clone, Default)]
pub struct GlobFileSet {
    patterns: Vec<FilePattern>,
}

impl GlobFileSet {
    pub fn new(includes: &[String], excludes: &[String]) -> Self {
        let patterns = includes
            .iter()
            .map(FilePattern::include)
            .chain(excludes.iter().map(FilePattern::exclude))
            .collect();
        Self { patterns }
    }

    /// Reads the rules from configuration. The include list is required, an
    /// empty one is allowed.
    pub fn from_config(config: &Config) -> Result<Self> {
        if !config.has(INCLUDE_KEY) {
            return Err(DocError::Config(format!("`{}` is not set", INCLUDE_KEY)));
        }
        Ok(Self::new(&config.get_list(INCLUDE_KEY), &config.get_list(EXCLUDE_KEY)))
    }

    pub fn add(&mut self, pattern: FilePattern) {
        self.patterns.push(pattern);
    }

    pub fn patterns(&self) -> &[FilePattern] {
        &self.patterns
    }

    /// Expands the include patterns and drops every candidate an exclude pattern matches.
    ///
    /// Excludes are tested against the file name, the path as globbed and the
    /// absolute path, so they win regardless of how the include was written.
    /// A pattern matching nothing is fine; an invalid pattern is a configuration error.
    pub fn resolve(&self) -> Result<ResolvedFileSet> {
        let excludes = self
            .patterns
            .iter()
            .filter(|p| p.role == PatternRole::Exclude)
            .map(|p| Pattern::new(&p.glob))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut candidates = BTreeSet::new();
        for pattern in self.patterns.iter().filter(|p| p.role == PatternRole::Include) {
            let mut matched = 0usize;
            for entry in glob::glob(&pattern.glob)? {
                match entry {
                    Ok(path) if path.is_file() => {
                        matched += 1;
                        candidates.insert(path);
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!("Cannot read {}: {}", e.path().display(), e),
                }
            }
            if matched == 0 {
                tracing::debug!("Pattern {} matched no files", pattern.glob);
            }
        }

        let files = candidates
            .into_iter()
            .filter_map(|path| {
                let absolute = absolute_path(&path);
                if is_excluded(&excludes, &path, &absolute) {
                    tracing::debug!("Excluding {}", path.display());
                    None
                } else {
                    Some(absolute)
                }
            })
            .collect();

        Ok(files)
    }
}

/// Expands glob patterns without any exclusion, e.g. for extra documentation pages.
pub fn expand(patterns: &[String]) -> Result<ResolvedFileSet> {
    GlobFileSet::new(patterns, &[]).resolve()
}

fn is_excluded(excludes: &[Pattern], path: &Path, absolute: &Path) -> bool {
    let file_name = path.file_name().map(|n| n.to_string_lossy().to_string());
    excludes.iter().any(|pattern| {
        file_name.as_deref().is_some_and(|name| pattern.matches(name))
            || pattern.matches_path(path)
            || pattern.matches_path(absolute)
    })
}

fn absolute_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
