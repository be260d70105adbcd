//! Source locations and stable ids shared across the compiler.
//!
//! Every AST node, checked expression and checked data type carries a
//! [`Location`]. Locations are bookkeeping only: they never participate in
//! equality of the things that carry them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a source file inside the current package.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub u32);

impl FileId {
    pub const DUMMY: FileId = FileId(u32::MAX);
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file#{}", self.0)
    }
}

/// A region of source text: file, 1-based line/column pair for both ends,
/// and the byte offsets of the region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: FileId,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
    pub start: u32,
    pub end: u32,
}

impl Location {
    pub const DUMMY: Location = Location {
        file: FileId::DUMMY,
        start_line: 0,
        start_column: 0,
        end_line: 0,
        end_column: 0,
        start: 0,
        end: 0,
    };

    pub fn new(
        file: FileId,
        start_line: u32,
        start_column: u32,
        end_line: u32,
        end_column: u32,
        start: u32,
        end: u32,
    ) -> Self {
        Location {
            file,
            start_line,
            start_column,
            end_line,
            end_column,
            start,
            end,
        }
    }

    pub fn is_dummy(&self) -> bool {
        self.file == FileId::DUMMY
    }

    /// The smallest location covering both `self` and `other`.
    ///
    /// Both must come from the same file; merging across files keeps `self`.
    pub fn to(&self, other: Location) -> Location {
        if self.file != other.file {
            return *self;
        }

        let (start_line, start_column, start) = if self.start <= other.start {
            (self.start_line, self.start_column, self.start)
        } else {
            (other.start_line, other.start_column, other.start)
        };
        let (end_line, end_column, end) = if self.end >= other.end {
            (self.end_line, self.end_column, self.end)
        } else {
            (other.end_line, other.end_column, other.end)
        };

        Location {
            file: self.file,
            start_line,
            start_column,
            end_line,
            end_column,
            start,
            end,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_column)
    }
}

/// Index of a lexical scope inside a [`ScopeArena`].
///
/// Ids are assigned monotonically per analysis run; MIR refers back to
/// scopes through these ids.
///
/// [`ScopeArena`]: ../lily_analysis/scope/struct.ScopeArena.html
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub const ROOT: ScopeId = ScopeId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

/// Index of a checked declaration inside the declaration arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclId(pub u32);

impl DeclId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "decl#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_widest_extent() {
        let file = FileId(0);
        let a = Location::new(file, 1, 4, 1, 9, 3, 8);
        let b = Location::new(file, 2, 1, 3, 5, 14, 30);

        let merged = a.to(b);
        assert_eq!(merged.start, 3);
        assert_eq!(merged.end, 30);
        assert_eq!(merged.start_line, 1);
        assert_eq!(merged.end_line, 3);
    }

    #[test]
    fn merge_across_files_is_identity() {
        let a = Location::new(FileId(0), 1, 1, 1, 2, 0, 1);
        let b = Location::new(FileId(1), 1, 1, 1, 2, 0, 1);
        assert_eq!(a.to(b), a);
    }
}
