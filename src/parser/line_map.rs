//! Preprocessor line markers
//!
//! GCC and Clang emit `# 12 "Foundation/include/Poco/Logger.h" 1`, MSVC emits
//! `#line 12 "..."`. Markers are blanked out before parsing (so row numbers
//! stay put) and remembered so every row can be mapped back to its origin.

#[derive(Debug, Clone, PartialEq, Eq)]
struct LineMark {
    /// Row of the marker in the preprocessed text
    row: usize,
    file: Option<String>,
    /// Line number the row after the marker has in `file`
    line: u32,
}

#[derive(Debug, Clone, Default)]
pub struct LineMap {
    marks: Vec<LineMark>,
}

impl LineMap {
    /// Returns `source` with every line marker replaced by an empty line, plus the map.
    pub fn strip(source: &str) -> (String, LineMap) {
        let mut stripped = String::with_capacity(source.len());
        let mut map = LineMap::default();
        let mut current_file: Option<String> = None;

        for (row, line) in source.split_inclusive('\n').enumerate() {
            match parse_marker(line) {
                Some((number, file)) => {
                    if file.is_some() {
                        current_file = file;
                    }
                    map.marks.push(LineMark {
                        row,
                        file: current_file.clone(),
                        line: number,
                    });
                    if line.ends_with('\n') {
                        stripped.push('\n');
                    }
                }
                None => stripped.push_str(line),
            }
        }

        (stripped, map)
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Maps a zero-based row of the preprocessed text to a file and one-based line.
    pub fn resolve(&self, row: usize, default_file: &str) -> (String, u32) {
        let idx = self.marks.partition_point(|mark| mark.row < row);
        if idx == 0 {
            return (default_file.to_string(), row as u32 + 1);
        }

        let mark = &self.marks[idx - 1];
        let file = mark.file.clone().unwrap_or_else(|| default_file.to_string());
        let offset = (row - mark.row - 1) as u32;
        (file, mark.line + offset)
    }
}

/// Parses `# N "file" flags` or `#line N "file"`.
fn parse_marker(line: &str) -> Option<(u32, Option<String>)> {
    let rest = line.trim_start().strip_prefix('#')?.trim_start();
    let rest = match rest.strip_prefix("line") {
        Some(after) if after.starts_with([' ', '\t']) => after.trim_start(),
        Some(_) => return None,
        None => rest,
    };

    let digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }
    let number: u32 = rest[..digits_end].parse().ok()?;

    let rest = rest[digits_end..].trim_start();
    let file = rest.strip_prefix('"').and_then(unescape_file_name);
    Some((number, file))
}

fn unescape_file_name(quoted: &str) -> Option<String> {
    let mut name = String::new();
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => return Some(name),
            '\\' => name.push(chars.next()?),
            c => name.push(c),
        }
    }
    None
}
