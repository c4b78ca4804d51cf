pub mod entry;
pub mod table;

pub use entry::{
    parent_scope, qualify, Access, BaseLink, BaseRef, EntryKind, FunctionInfo, Location,
    StructInfo, StructKeyword, SymbolEntry, SCOPE_SEPARATOR,
};
pub use table::{MergeOutcome, SymbolTable};
