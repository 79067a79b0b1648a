//! Query messages: what a client asks the daemon to do, and under which
//! output policies.

use crate::index::types::KeyFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Bit set of query-level behavior flags.
///
/// Carried on the wire as a plain integer; the constants below are the only
/// defined bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryFlags(pub u32);

impl QueryFlags {
    pub const NONE: u32 = 0;
    /// Suppress the daemon-side diagnostic echo of emitted lines
    pub const SILENT: u32 = 1 << 0;
    /// Path filters are regular expressions instead of literal prefixes
    pub const MATCH_REGEX: u32 = 1 << 1;
    /// Reject output lines referring to the system include tree
    pub const FILTER_SYSTEM: u32 = 1 << 2;
    /// Annotate locations with the enclosing function definition
    pub const CONTAINING_FUNCTION: u32 = 1 << 3;
    /// Annotate locations with the symbol kind spelling
    pub const CURSOR_KIND: u32 = 1 << 4;
    /// Annotate locations with the symbol display name
    pub const DISPLAY_NAME: u32 = 1 << 5;
    /// Render numeric file ids instead of paths in location keys
    pub const KEY_FILE_IDS: u32 = 1 << 6;
    /// Wrap output lines in double quotes, escaping embedded quotes
    pub const QUOTE: u32 = 1 << 7;

    pub fn new() -> Self {
        Self(Self::NONE)
    }

    pub fn contains(&self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    pub fn set(&mut self, flag: u32) {
        self.0 |= flag;
    }

    pub fn with(mut self, flag: u32) -> Self {
        self.set(flag);
        self
    }
}

/// The operation a query performs.
///
/// The daemon builds the matching executor for each kind; this layer defines
/// how the executor's results reach the client, not what they are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum QueryKind {
    /// Find symbols whose name contains a pattern
    FindSymbols { pattern: String },
    /// Describe the symbol record at a source location
    SymbolInfo { path: PathBuf, line: u32, column: u32 },
    /// List every symbol of one indexed file
    ListFile { path: PathBuf },
}

/// One query request as received from a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMessage {
    pub kind: QueryKind,
    /// Cap on successfully emitted output lines. `None` means unlimited.
    #[serde(default)]
    pub max: Option<u32>,
    /// Restrict location output to `[min, max]` lines, both inclusive.
    /// The bounds always come as a pair.
    #[serde(default)]
    pub line_range: Option<(u32, u32)>,
    /// Literal path prefixes, or regexes under [`QueryFlags::MATCH_REGEX`].
    #[serde(default)]
    pub path_filters: Vec<String>,
    #[serde(default)]
    pub flags: QueryFlags,
}

impl QueryMessage {
    pub fn new(kind: QueryKind) -> Self {
        Self {
            kind,
            max: None,
            line_range: None,
            path_filters: Vec::new(),
            flags: QueryFlags::default(),
        }
    }

    pub fn has(&self, flag: u32) -> bool {
        self.flags.contains(flag)
    }

    pub fn key_format(&self) -> KeyFormat {
        KeyFormat {
            file_ids: self.has(QueryFlags::KEY_FILE_IDS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_operations() {
        let mut flags = QueryFlags::new();
        assert!(!flags.contains(QueryFlags::SILENT));
        flags.set(QueryFlags::SILENT);
        flags.set(QueryFlags::CURSOR_KIND);
        assert!(flags.contains(QueryFlags::SILENT));
        assert!(flags.contains(QueryFlags::CURSOR_KIND));
        assert!(!flags.contains(QueryFlags::MATCH_REGEX));

        let flags = QueryFlags::new().with(QueryFlags::QUOTE);
        assert!(flags.contains(QueryFlags::QUOTE));
    }

    #[test]
    fn message_defaults_survive_sparse_json() {
        let msg: QueryMessage = serde_json::from_str(
            r#"{"kind": {"type": "FindSymbols", "pattern": "main"}}"#,
        )
        .unwrap();
        assert_eq!(
            msg.kind,
            QueryKind::FindSymbols {
                pattern: "main".to_string()
            }
        );
        assert_eq!(msg.max, None);
        assert_eq!(msg.line_range, None);
        assert!(msg.path_filters.is_empty());
        assert_eq!(msg.flags, QueryFlags::default());
    }

    #[test]
    fn key_format_follows_flag() {
        let mut msg = QueryMessage::new(QueryKind::ListFile {
            path: PathBuf::from("a.cpp"),
        });
        assert!(!msg.key_format().file_ids);
        msg.flags.set(QueryFlags::KEY_FILE_IDS);
        assert!(msg.key_format().file_ids);
    }
}
