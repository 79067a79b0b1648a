//! The symbol database: locations, symbol records, the ordered symbol
//! table, and the project handle that owns both.
//!
//! Building the database is the external indexer's job; this crate only
//! loads and reads it.

pub mod project;
pub mod table;
pub mod types;

pub use project::{PathTable, Project};
pub use table::{Cursor, SymbolTable};
pub use types::{FileId, KeyFormat, Location, LocationSpec, Symbol, SymbolKind};
