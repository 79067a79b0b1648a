//! Ordered symbol table with backward-stepping cursors.
//!
//! The table maps [`Location`]s to [`Symbol`] records in location order
//! (file, line, column). Queries need three access shapes: point lookup,
//! forward range iteration over one file, and a backward walk from an entry
//! toward the table start. The backward walk is exposed as a [`Cursor`] with
//! an explicit "predecessor or none" step instead of raw iterator decrement.

use crate::index::types::{FileId, Location, Symbol};
use std::collections::BTreeMap;
use std::ops::Bound;

/// Ordered mapping from [`Location`] to [`Symbol`].
#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: BTreeMap<Location, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, location: Location, symbol: Symbol) -> Option<Symbol> {
        self.entries.insert(location, symbol)
    }

    pub fn get(&self, location: Location) -> Option<&Symbol> {
        self.entries.get(&location)
    }

    /// Point lookup, returning a cursor positioned at the entry.
    pub fn find(&self, location: Location) -> Option<Cursor<'_>> {
        self.entries
            .get_key_value(&location)
            .map(|(at, symbol)| Cursor {
                table: self,
                at: *at,
                symbol,
            })
    }

    /// All entries in location order.
    pub fn iter(&self) -> impl Iterator<Item = (&Location, &Symbol)> {
        self.entries.iter()
    }

    /// All entries belonging to one file, in location order.
    pub fn file_range(&self, file_id: FileId) -> impl Iterator<Item = (&Location, &Symbol)> {
        let start = Bound::Included(Location::file_start(file_id));
        let end = match file_id.checked_add(1) {
            Some(next) => Bound::Excluded(Location::file_start(next)),
            None => Bound::Unbounded,
        };
        self.entries.range((start, end))
    }
}

/// A read cursor positioned at one table entry.
///
/// [`Cursor::step_back`] moves to the predecessor entry, reporting `false`
/// at the table start; the cursor never dangles, so walking backward from a
/// found entry needs no begin-sentinel bookkeeping.
pub struct Cursor<'a> {
    table: &'a SymbolTable,
    at: Location,
    symbol: &'a Symbol,
}

impl<'a> Cursor<'a> {
    pub fn location(&self) -> Location {
        self.at
    }

    pub fn symbol(&self) -> &'a Symbol {
        self.symbol
    }

    /// Step to the predecessor entry. Returns `false` at the table start,
    /// leaving the cursor where it was.
    pub fn step_back(&mut self) -> bool {
        match self.table.entries.range(..self.at).next_back() {
            Some((at, symbol)) => {
                self.at = *at;
                self.symbol = symbol;
                true
            }
            None => false,
        }
    }
}
