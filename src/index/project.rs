//! Project state: interned file paths plus the loaded symbol table.
//!
//! A [`Project`] is the read-only handle query jobs annotate against. It is
//! built once from the database file the external indexer writes under the
//! project root and never mutated afterward, which is what lets many jobs
//! read it concurrently behind an `Arc` without locking.

use crate::index::table::SymbolTable;
use crate::index::types::{FileId, KeyFormat, Location, Symbol};
use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Supported symbol database format version
pub const DATABASE_VERSION: u32 = 1;

/// Interned file paths. Ids start at 1; id 0 is reserved for the null location.
#[derive(Debug, Default)]
pub struct PathTable {
    paths: Vec<PathBuf>,
    ids: FxHashMap<PathBuf, FileId>,
}

impl PathTable {
    pub fn intern(&mut self, path: impl Into<PathBuf>) -> FileId {
        let path = path.into();
        if let Some(&id) = self.ids.get(&path) {
            return id;
        }
        self.paths.push(path.clone());
        let id = self.paths.len() as FileId;
        self.ids.insert(path, id);
        id
    }

    pub fn id(&self, path: &Path) -> Option<FileId> {
        self.ids.get(path).copied()
    }

    pub fn path(&self, id: FileId) -> Option<&Path> {
        if id == 0 {
            return None;
        }
        self.paths.get(id as usize - 1).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// On-disk symbol database written by the indexer.
///
/// `symbols` locations carry file ids 1..=files.len(), matching the order of
/// `files`.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct DatabaseFile {
    pub version: u32,
    pub files: Vec<PathBuf>,
    pub symbols: Vec<(Location, Symbol)>,
}

/// The symbol database for one source tree.
pub struct Project {
    root: PathBuf,
    paths: PathTable,
    symbols: SymbolTable,
}

impl Project {
    /// Load the symbol database for a project root.
    ///
    /// `database_path` is the database file's location relative to the root
    /// (configurable, `.symq/symbols.json` by default).
    pub fn load(root: &Path, database_path: &Path) -> Result<Self> {
        let db_path = root.join(database_path);
        let content = fs::read_to_string(&db_path)
            .with_context(|| format!("failed to read symbol database {}", db_path.display()))?;
        let db: DatabaseFile = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse symbol database {}", db_path.display()))?;
        anyhow::ensure!(
            db.version == DATABASE_VERSION,
            "unsupported symbol database version {} (expected {})",
            db.version,
            DATABASE_VERSION
        );

        let mut paths = PathTable::default();
        for file in &db.files {
            paths.intern(file.clone());
        }
        let mut symbols = SymbolTable::new();
        for (location, symbol) in db.symbols {
            anyhow::ensure!(
                !location.is_null() && (location.file_id() as usize) <= db.files.len(),
                "symbol {:?} references unknown file id {}",
                symbol.symbol_name,
                location.file_id()
            );
            symbols.insert(location, symbol);
        }

        Ok(Self {
            root: root.to_path_buf(),
            paths,
            symbols,
        })
    }

    /// Assemble a project from already-built parts.
    pub fn from_parts(root: PathBuf, paths: PathTable, symbols: SymbolTable) -> Self {
        Self {
            root,
            paths,
            symbols,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn paths(&self) -> &PathTable {
        &self.paths
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Resolve a path and position into a table location.
    /// Unknown paths resolve to the null location.
    pub fn location(&self, path: &Path, line: u32, column: u32) -> Location {
        match self.paths.id(path) {
            Some(id) => Location::new(id, line, column),
            None => Location::NONE,
        }
    }

    /// Render the stable textual key for a location: `path:line:column:`,
    /// or `#fileid:line:column:` under the numeric format (and for ids the
    /// path table does not know).
    pub fn location_key(&self, location: Location, format: KeyFormat) -> String {
        if location.is_null() {
            return String::new();
        }
        if !format.file_ids
            && let Some(path) = self.paths.path(location.file_id())
        {
            format!(
                "{}:{}:{}:",
                path.display(),
                location.line(),
                location.column()
            )
        } else {
            format!(
                "#{}:{}:{}:",
                location.file_id(),
                location.line(),
                location.column()
            )
        }
    }
}
