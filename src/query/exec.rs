//! The query executors the daemon ships.
//!
//! Each executor owns the scan that produces result locations or records;
//! everything about how those results reach the client (filtering, quoting,
//! caps, annotation) is the bound job's business. Executors stop scanning as
//! soon as the job aborts or the line cap is exhausted.

use crate::index::types::{Location, Symbol};
use crate::query::job::{BoundJob, QueryExec, WriteOptions};
use crate::query::message::QueryKind;
use std::path::PathBuf;
use std::sync::Arc;

/// Exit codes executors report through `QueryJob::run`
pub const EXIT_OK: i32 = 0;
pub const EXIT_ABORTED: i32 = 1;
pub const EXIT_NOT_FOUND: i32 = 2;

/// Build the executor for a query kind.
pub fn executor_for(kind: &QueryKind) -> Box<dyn QueryExec + Send> {
    match kind {
        QueryKind::FindSymbols { pattern } => Box::new(FindSymbols::new(pattern.clone())),
        QueryKind::SymbolInfo { path, line, column } => {
            Box::new(SymbolInfo::new(path.clone(), *line, *column))
        }
        QueryKind::ListFile { path } => Box::new(ListFile::new(path.clone())),
    }
}

/// Find symbols whose name contains a pattern, in table order.
pub struct FindSymbols {
    pattern: String,
}

impl FindSymbols {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }
}

fn scan_locations<'t>(
    job: &mut BoundJob<'_>,
    pattern: &str,
    entries: impl Iterator<Item = (&'t Location, &'t Symbol)>,
) -> i32 {
    let options = WriteOptions::default();
    for (location, symbol) in entries {
        if !symbol.symbol_name.contains(pattern) {
            continue;
        }
        if !job.write_location(*location, options) {
            if job.aborted() {
                return EXIT_ABORTED;
            }
            if job.job().cap_reached() {
                break;
            }
            // line-range rejection: keep scanning
        }
    }
    EXIT_OK
}

impl QueryExec for FindSymbols {
    fn execute(&mut self, job: &mut BoundJob<'_>) -> i32 {
        let project = Arc::clone(job.job().project());
        // a single-path literal filter narrows the scan to that file
        match job.job().file_filter() {
            Some(file_id) => {
                scan_locations(job, &self.pattern, project.symbols().file_range(file_id))
            }
            None => scan_locations(job, &self.pattern, project.symbols().iter()),
        }
    }
}

/// Describe the symbol record at one source location.
pub struct SymbolInfo {
    path: PathBuf,
    line: u32,
    column: u32,
}

impl SymbolInfo {
    pub fn new(path: PathBuf, line: u32, column: u32) -> Self {
        Self { path, line, column }
    }
}

impl QueryExec for SymbolInfo {
    fn execute(&mut self, job: &mut BoundJob<'_>) -> i32 {
        let project = Arc::clone(job.job().project());
        let location = project.location(&self.path, self.line, self.column);
        if location.is_null() {
            return EXIT_NOT_FOUND;
        }
        let Some(cursor) = project.symbols().find(location) else {
            return EXIT_NOT_FOUND;
        };
        if !job.write_symbol(location, cursor.symbol(), WriteOptions::default()) && job.aborted() {
            return EXIT_ABORTED;
        }
        EXIT_OK
    }
}

/// List every symbol of one indexed file, in location order.
pub struct ListFile {
    path: PathBuf,
}

impl ListFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl QueryExec for ListFile {
    fn execute(&mut self, job: &mut BoundJob<'_>) -> i32 {
        let project = Arc::clone(job.job().project());
        let Some(file_id) = project.paths().id(&self.path) else {
            return EXIT_NOT_FOUND;
        };
        for (location, symbol) in project.symbols().file_range(file_id) {
            if !job.write_symbol(*location, symbol, WriteOptions::default()) {
                if job.aborted() {
                    return EXIT_ABORTED;
                }
                if job.job().cap_reached() {
                    break;
                }
            }
        }
        EXIT_OK
    }
}
