pub mod cpp;
pub mod line_map;

use std::io::Read;
use std::path::Path;

use crate::error::Result;
use crate::symbols::SymbolTable;

pub use cpp::CppParser;
pub use line_map::LineMap;

/// Turns one preprocessed translation unit into symbol table entries.
///
/// Implementations merge into `table` and report syntax problems as
/// [`DocError::Parse`](crate::DocError::Parse). They are driven by one thread
/// at a time and never see the table concurrently.
pub trait SourceParser {
    fn parse(&mut self, table: &mut SymbolTable, file_name: &Path, stream: &mut dyn Read)
        -> Result<()>;
}
