//! Path-based output filtering.
//!
//! A query may restrict which result lines reach the client, either by
//! literal path prefix or by regular expression. The two shapes are mutually
//! exclusive by construction, never both.

use crate::index::project::Project;
use crate::index::types::FileId;
use crate::query::message::{QueryFlags, QueryMessage};
use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;

/// Path prefixes recognized as the system include tree
const SYSTEM_ROOTS: [&str; 4] = ["/usr/include/", "/usr/local/include/", "/usr/lib/", "/opt/"];

/// True if a (whitespace-trimmed) output line starts inside the system
/// include tree.
pub fn is_system_path(trimmed: &str) -> bool {
    SYSTEM_ROOTS.iter().any(|root| trimmed.starts_with(root))
}

/// Query-scoped inclusion rules for output lines, fixed at job construction.
#[derive(Debug, Default)]
pub enum PathFilter {
    /// No filter: every line passes
    #[default]
    None,
    /// Literal prefixes: a trimmed line passes if it starts with one
    Prefixes(Vec<String>),
    /// Compiled patterns: a trimmed line passes if one matches anywhere
    Patterns(Vec<Regex>),
}

impl PathFilter {
    /// Build the filter representation a query message asks for.
    ///
    /// Fails on an invalid regex when the message requests pattern matching.
    pub fn from_message(message: &QueryMessage) -> Result<Self> {
        if message.path_filters.is_empty() {
            return Ok(Self::None);
        }
        if message.has(QueryFlags::MATCH_REGEX) {
            let mut patterns = Vec::with_capacity(message.path_filters.len());
            for raw in &message.path_filters {
                let pattern = Regex::new(raw)
                    .with_context(|| format!("invalid path filter pattern {raw:?}"))?;
                patterns.push(pattern);
            }
            Ok(Self::Patterns(patterns))
        } else {
            Ok(Self::Prefixes(message.path_filters.clone()))
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Whether a whitespace-trimmed line satisfies the active representation.
    pub fn matches(&self, trimmed: &str) -> bool {
        match self {
            Self::None => true,
            Self::Prefixes(prefixes) => prefixes.iter().any(|p| trimmed.starts_with(p.as_str())),
            Self::Patterns(patterns) => patterns.iter().any(|re| re.is_match(trimmed)),
        }
    }

    /// The single indexed file a one-entry literal filter narrows to, if any.
    ///
    /// Executors use this to restrict their table scan to that file's key
    /// range instead of filtering every produced line after the fact.
    pub fn single_file(&self, project: &Project) -> Option<FileId> {
        match self {
            Self::Prefixes(prefixes) if prefixes.len() == 1 => {
                project.paths().id(Path::new(&prefixes[0]))
            }
            _ => None,
        }
    }
}
