use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::PathBuf;
use std::str::FromStr;

/// Unique identifier for a file path in the path table.
///
/// Id 0 is reserved; it marks the null [`Location`].
pub type FileId = u32;

/// Options controlling how location keys are rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyFormat {
    /// Render the numeric file id instead of the file path
    pub file_ids: bool,
}

/// A point in indexed source: file, line and column (1-based).
///
/// Ordered by file id, then line, then column. This is the symbol table's
/// iteration order, and the containing-function search walks against it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Location {
    file_id: FileId,
    line: u32,
    column: u32,
}

impl Location {
    /// The null location: refers to no file.
    pub const NONE: Location = Location {
        file_id: 0,
        line: 0,
        column: 0,
    };

    pub fn new(file_id: FileId, line: u32, column: u32) -> Self {
        Self {
            file_id,
            line,
            column,
        }
    }

    pub fn is_null(&self) -> bool {
        self.file_id == 0
    }

    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    /// Smallest location within a file; the start bound for file range scans.
    pub(crate) fn file_start(file_id: FileId) -> Self {
        Self {
            file_id,
            line: 0,
            column: 0,
        }
    }
}

/// Compare a (line, column) position against another, line first.
pub fn compare_position(line: u32, column: u32, other_line: u32, other_column: u32) -> Ordering {
    match line.cmp(&other_line) {
        Ordering::Equal => column.cmp(&other_column),
        ord => ord,
    }
}

/// A `path:line[:column]` argument as the user typed it, before the path is
/// resolved against a project's path table. Column defaults to 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationSpec {
    pub path: PathBuf,
    pub line: u32,
    pub column: u32,
}

impl FromStr for LocationSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || format!("expected path:line[:column], got {s:?}");
        let mut parts = s.rsplitn(3, ':');
        let last = parts.next().ok_or_else(err)?;
        let middle = parts.next().ok_or_else(err)?;
        let (path, line, column) = match parts.next() {
            Some(path) => {
                let line: u32 = middle.parse().map_err(|_| err())?;
                let column: u32 = last.parse().map_err(|_| err())?;
                (path, line, column)
            }
            None => {
                let line: u32 = last.parse().map_err(|_| err())?;
                (middle, line, 1)
            }
        };
        if line == 0 || column == 0 {
            return Err(format!("line and column are 1-based, got {s:?}"));
        }
        Ok(Self {
            path: PathBuf::from(path),
            line,
            column,
        })
    }
}

/// Classification of an indexed symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Constructor,
    Class,
    Struct,
    Enum,
    Union,
    Namespace,
    Variable,
    Field,
    Parameter,
    Typedef,
    Macro,
    Unknown,
}

impl SymbolKind {
    /// True for kinds that introduce a scope symbols can live inside
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            SymbolKind::Function
                | SymbolKind::Method
                | SymbolKind::Constructor
                | SymbolKind::Class
                | SymbolKind::Struct
                | SymbolKind::Enum
                | SymbolKind::Union
                | SymbolKind::Namespace
        )
    }

    /// The human-readable kind name used in annotated output
    pub fn spelling(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Constructor => "constructor",
            SymbolKind::Class => "class",
            SymbolKind::Struct => "struct",
            SymbolKind::Enum => "enum",
            SymbolKind::Union => "union",
            SymbolKind::Namespace => "namespace",
            SymbolKind::Variable => "variable",
            SymbolKind::Field => "field",
            SymbolKind::Parameter => "parameter",
            SymbolKind::Typedef => "typedef",
            SymbolKind::Macro => "macro",
            SymbolKind::Unknown => "unknown",
        }
    }
}

/// An indexed symbol record, keyed by its [`Location`] in the symbol table.
///
/// The keyed location is the symbol's defining or reference point; it is not
/// necessarily inside the record's own source range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub symbol_name: String,
    pub display_name: String,
    pub kind: SymbolKind,
    pub is_definition: bool,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Symbol {
    /// A record with no name carries no information; output routines reject it.
    pub fn is_empty(&self) -> bool {
        self.symbol_name.is_empty()
    }

    /// True if (line, column) falls within the record's source range.
    /// Both endpoints are inclusive; lines compare before columns.
    pub fn contains(&self, line: u32, column: u32) -> bool {
        compare_position(line, column, self.start_line, self.start_column) != Ordering::Less
            && compare_position(line, column, self.end_line, self.end_column) != Ordering::Greater
    }
}
