pub mod build;
pub mod config;
pub mod error;
pub mod files;
pub mod parser;
pub mod preprocess;
pub mod render;
pub mod symbols;

pub use build::{
    ancestors, fixup, inherited_members, BuildOptions, BuildStats, BuildSummary, DocBuilder,
    ParseCoordinator,
};
pub use config::Config;
pub use error::{DocError, Result};
pub use files::{FilePattern, GlobFileSet, PatternRole, ResolvedFileSet};
pub use parser::{CppParser, LineMap, SourceParser};
pub use preprocess::{PreprocessJob, Preprocessor, ToolConfig, Transport};
pub use render::{JsonRenderer, RenderOptions, Renderer};
pub use symbols::{
    Access, BaseLink, BaseRef, EntryKind, FunctionInfo, Location, MergeOutcome, StructInfo,
    StructKeyword, SymbolEntry, SymbolTable,
};
