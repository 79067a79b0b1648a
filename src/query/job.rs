//! Query job execution: filtered, quoted, line-capped result streaming.
//!
//! A [`QueryJob`] carries one query's output policies (path filter, quoting,
//! line cap, line range) and its per-run state (`aborted`, lines written).
//! The output methods live on [`BoundJob`], which only exists while
//! [`QueryJob::run`] has a [`Connection`] bound, so output outside a run is
//! unrepresentable rather than asserted.

use crate::index::project::Project;
use crate::index::table::Cursor;
use crate::index::types::{FileId, KeyFormat, Location, Symbol};
use crate::query::filter::{self, PathFilter};
use crate::query::message::{QueryFlags, QueryMessage};
use anyhow::Result;
use log::{debug, warn};
use memchr::memchr_iter;
use std::sync::Arc;

/// Job-scoped output behavior, fixed at construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct JobOptions {
    /// Suppress the diagnostic echo of emitted lines
    pub quiet: bool,
    /// Wrap emitted lines in double quotes, escaping embedded quotes
    pub quote_output: bool,
    /// Bypass path filtering (including the system-path check) for every
    /// write of this job
    pub write_unfiltered: bool,
}

/// Per-call overrides for a single write.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Bypass path filtering for this call only
    pub unfiltered: bool,
    /// Skip quoting for this call only
    pub dont_quote: bool,
    /// Bypass the output line cap for this call only
    pub ignore_max: bool,
}

/// Output sink bound to a job for the duration of one run.
///
/// One blocking send per line. `false` means the send failed (peer gone,
/// transport error); no partial-line semantics are assumed.
pub trait Connection {
    fn write_line(&mut self, line: &str) -> bool;
}

/// Side channel receiving a copy of every non-quiet write attempt.
/// Not subject to the line cap or to connection failures.
pub trait DiagnosticSink {
    fn echo(&mut self, line: &str);
}

/// Default sink: forwards to the log backend.
#[derive(Debug, Default)]
pub struct LogEcho;

impl DiagnosticSink for LogEcho {
    fn echo(&mut self, line: &str) {
        debug!("=> {line}");
    }
}

/// One query's result-producing logic.
///
/// Implementations call the bound job's write entry points until nothing is
/// left to report or a write reports failure, then return an exit code
/// (0 = success).
pub trait QueryExec {
    fn execute(&mut self, job: &mut BoundJob<'_>) -> i32;
}

/// Adapter running a closure as a query executor.
pub struct ExecFn<F>(pub F);

impl<F: FnMut(&mut BoundJob<'_>) -> i32> QueryExec for ExecFn<F> {
    fn execute(&mut self, job: &mut BoundJob<'_>) -> i32 {
        (self.0)(job)
    }
}

/// Execution state for one query.
///
/// Constructed once per incoming query, run once, then discarded. Never
/// shared across threads during a run.
pub struct QueryJob {
    aborted: bool,
    lines_written: u32,
    message: Option<QueryMessage>,
    options: JobOptions,
    project: Arc<Project>,
    path_filter: PathFilter,
    sink: Box<dyn DiagnosticSink + Send>,
}

impl QueryJob {
    /// Build a job for one query message.
    ///
    /// Fails if the message carries an invalid filter pattern.
    pub fn new(
        message: QueryMessage,
        mut options: JobOptions,
        project: Arc<Project>,
    ) -> Result<Self> {
        if message.has(QueryFlags::SILENT) {
            options.quiet = true;
        }
        let path_filter = PathFilter::from_message(&message)?;
        Ok(Self {
            aborted: false,
            lines_written: 0,
            message: Some(message),
            options,
            project,
            path_filter,
            sink: Box::new(LogEcho),
        })
    }

    /// Build a job with no originating message: unfiltered by paths,
    /// uncapped, no line range. Used by internal callers.
    pub fn without_message(options: JobOptions, project: Arc<Project>) -> Self {
        Self {
            aborted: false,
            lines_written: 0,
            message: None,
            options,
            project,
            path_filter: PathFilter::None,
            sink: Box::new(LogEcho),
        }
    }

    /// Replace the diagnostic sink.
    pub fn with_sink(mut self, sink: Box<dyn DiagnosticSink + Send>) -> Self {
        self.sink = sink;
        self
    }

    pub fn aborted(&self) -> bool {
        self.aborted
    }

    pub fn lines_written(&self) -> u32 {
        self.lines_written
    }

    pub fn options(&self) -> JobOptions {
        self.options
    }

    pub fn message(&self) -> Option<&QueryMessage> {
        self.message.as_ref()
    }

    pub fn project(&self) -> &Arc<Project> {
        &self.project
    }

    fn query_flags(&self) -> QueryFlags {
        self.message.as_ref().map(|m| m.flags).unwrap_or_default()
    }

    pub fn key_format(&self) -> KeyFormat {
        self.message
            .as_ref()
            .map(|m| m.key_format())
            .unwrap_or_default()
    }

    /// True once the line cap is exhausted. Executors stop scanning at this
    /// point; further capped writes would only be refused.
    pub fn cap_reached(&self) -> bool {
        self.message
            .as_ref()
            .and_then(|m| m.max)
            .is_some_and(|max| self.lines_written >= max)
    }

    /// The single indexed file a one-entry literal path filter narrows to.
    pub fn file_filter(&self) -> Option<FileId> {
        self.path_filter.single_file(&self.project)
    }

    /// Whether a raw output line is eligible for emission.
    ///
    /// The system-path check runs first, against the whitespace-trimmed
    /// line; a system path is rejected even when it would match a filter.
    /// With no filter set and no system check requested, every line passes.
    pub fn filter(&self, line: &str) -> bool {
        let filter_system = self.query_flags().contains(QueryFlags::FILTER_SYSTEM);
        if self.path_filter.is_none() && !filter_system {
            return true;
        }
        let trimmed = line.trim_start();
        if filter_system && filter::is_system_path(trimmed) {
            return false;
        }
        self.path_filter.matches(trimmed)
    }

    /// Run one query execution with a connection bound for its duration.
    /// Returns the executor's exit code.
    pub fn run(&mut self, exec: &mut dyn QueryExec, connection: &mut dyn Connection) -> i32 {
        let mut bound = BoundJob {
            job: self,
            connection,
        };
        exec.execute(&mut bound)
    }
}

/// A job with a connection bound to it; the only place output can happen.
pub struct BoundJob<'a> {
    job: &'a mut QueryJob,
    connection: &'a mut dyn Connection,
}

impl BoundJob<'_> {
    /// Read access to the job for executors (flags, project, cap state).
    pub fn job(&self) -> &QueryJob {
        self.job
    }

    pub fn aborted(&self) -> bool {
        self.job.aborted
    }

    /// Emit one line, subject to filtering, quoting and the line cap.
    ///
    /// A filtered-out line is a silent no-op success. `false` means the cap
    /// refused the line or the send failed.
    pub fn write(&mut self, line: &str, options: WriteOptions) -> bool {
        if !(self.job.options.write_unfiltered || options.unfiltered || self.job.filter(line)) {
            return true;
        }
        if self.job.options.quote_output && !options.dont_quote {
            self.write_raw(&quote(line), options)
        } else {
            self.write_raw(line, options)
        }
    }

    /// Emit a line bypassing filter and quoting, still subject to the cap.
    ///
    /// A cap refusal returns `false` without counting the line. A failed
    /// send marks the job aborted, which is sticky for the rest of the run.
    pub fn write_raw(&mut self, line: &str, options: WriteOptions) -> bool {
        if !options.ignore_max
            && let Some(message) = &self.job.message
        {
            if let Some(max) = message.max
                && self.job.lines_written >= max
            {
                return false;
            }
            self.job.lines_written += 1;
        }

        if !self.job.options.quiet {
            self.job.sink.echo(line);
        }

        if !self.connection.write_line(line) {
            self.job.aborted = true;
            return false;
        }
        true
    }

    /// Format and emit one source location.
    ///
    /// Rejects the null location and locations outside the query's line
    /// range. When the query requests annotation (display name, kind,
    /// containing function), the location is looked up in the symbol table;
    /// a missing entry is logged and the base key still emitted.
    pub fn write_location(&mut self, location: Location, options: WriteOptions) -> bool {
        if location.is_null() {
            return false;
        }
        if let Some(message) = &self.job.message
            && let Some((min_line, max_line)) = message.line_range
        {
            debug_assert!(min_line <= max_line);
            let line = location.line();
            if line < min_line || line > max_line {
                return false;
            }
        }

        let mut out = self
            .job
            .project
            .location_key(location, self.job.key_format());
        let flags = self.job.query_flags();
        let containing_function = flags.contains(QueryFlags::CONTAINING_FUNCTION);
        let cursor_kind = flags.contains(QueryFlags::CURSOR_KIND);
        let display_name = flags.contains(QueryFlags::DISPLAY_NAME);
        if containing_function || cursor_kind || display_name {
            match self.job.project.symbols().find(location) {
                None => warn!("no symbol entry for {out}"),
                Some(mut cursor) => {
                    if display_name {
                        out.push('\t');
                        out.push_str(&cursor.symbol().display_name);
                    }
                    if cursor_kind {
                        out.push('\t');
                        out.push_str(cursor.symbol().kind.spelling());
                    }
                    if containing_function
                        && let Some(name) = containing_function_of(&mut cursor, location)
                    {
                        out.push_str("\tfunction: ");
                        out.push_str(name);
                    }
                }
            }
        }
        self.write(&out, options)
    }

    /// Format and emit one symbol record: key, display name, kind spelling,
    /// and a `def` marker for definitions, tab-separated.
    pub fn write_symbol(
        &mut self,
        location: Location,
        symbol: &Symbol,
        options: WriteOptions,
    ) -> bool {
        if location.is_null() || symbol.is_empty() {
            return false;
        }
        let mut out = self
            .job
            .project
            .location_key(location, self.job.key_format());
        out.push('\t');
        out.push_str(&symbol.display_name);
        out.push('\t');
        out.push_str(symbol.kind.spelling());
        if symbol.is_definition {
            out.push_str("\tdef");
        }
        self.write(&out, options)
    }
}

/// Backward scan from a table entry toward the table start, for the nearest
/// enclosing definition whose source range contains the location.
///
/// The entry the cursor starts on is not considered, only its predecessors.
/// The scan ends without a match when it leaves the location's file or
/// reaches the table start.
fn containing_function_of<'a>(cursor: &mut Cursor<'a>, location: Location) -> Option<&'a str> {
    while cursor.step_back() {
        if cursor.location().file_id() != location.file_id() {
            return None;
        }
        let symbol = cursor.symbol();
        if symbol.is_definition
            && symbol.kind.is_container()
            && symbol.contains(location.line(), location.column())
        {
            return Some(&symbol.symbol_name);
        }
    }
    None
}

/// Wrap a line in double quotes, escaping each embedded `"` as `\"`.
/// Every other byte passes through unchanged.
fn quote(line: &str) -> String {
    let bytes = line.as_bytes();
    let mut out = String::with_capacity(line.len() + 2);
    out.push('"');
    let mut start = 0;
    for at in memchr_iter(b'"', bytes) {
        out.push_str(&line[start..at]);
        out.push_str("\\\"");
        start = at + 1;
    }
    out.push_str(&line[start..]);
    out.push('"');
    out
}
