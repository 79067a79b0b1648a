//! End-to-end tests of query job streaming: filtering, caps, annotation,
//! and abort behavior, driven through the public executor surface.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use symq::index::{PathTable, Project, SymbolTable};
use symq::index::types::{Location, Symbol, SymbolKind};
use symq::query::{
    Connection, EXIT_ABORTED, EXIT_NOT_FOUND, EXIT_OK, ExecFn, JobOptions, QueryFlags, QueryJob,
    QueryKind, QueryMessage, WriteOptions, executor_for,
};

/// Connection that records lines; optionally fails every send from a point on.
#[derive(Default)]
struct Recorder {
    lines: Vec<String>,
    attempts: usize,
    fail_from: Option<usize>,
}

impl Connection for Recorder {
    fn write_line(&mut self, line: &str) -> bool {
        self.attempts += 1;
        if self.fail_from.is_some_and(|n| self.attempts > n) {
            return false;
        }
        self.lines.push(line.to_string());
        true
    }
}

fn symbol(
    name: &str,
    kind: SymbolKind,
    is_definition: bool,
    start: (u32, u32),
    end: (u32, u32),
) -> Symbol {
    Symbol {
        symbol_name: name.to_string(),
        display_name: format!("{name}()"),
        kind,
        is_definition,
        start_line: start.0,
        start_column: start.1,
        end_line: end.0,
        end_column: end.1,
    }
}

/// Two files; file `src/a.cpp` holds an enclosing function definition at
/// line 10 spanning lines 10-50, a non-container definition at line 20, and
/// plain reference entries around it.
fn sample_project() -> Arc<Project> {
    let mut paths = PathTable::default();
    let a = paths.intern("src/a.cpp");
    let b = paths.intern("src/b.cpp");

    let mut symbols = SymbolTable::new();
    symbols.insert(
        Location::new(a, 5, 1),
        symbol("early", SymbolKind::Variable, false, (5, 1), (5, 6)),
    );
    symbols.insert(
        Location::new(a, 10, 1),
        symbol("outer", SymbolKind::Function, true, (10, 1), (50, 1)),
    );
    symbols.insert(
        Location::new(a, 20, 5),
        symbol("mid", SymbolKind::Variable, true, (20, 5), (20, 9)),
    );
    symbols.insert(
        Location::new(a, 25, 2),
        symbol("use_site", SymbolKind::Variable, false, (25, 2), (25, 10)),
    );
    symbols.insert(
        Location::new(a, 40, 1),
        symbol("inner", SymbolKind::Function, true, (35, 1), (45, 1)),
    );
    symbols.insert(
        Location::new(b, 5, 1),
        symbol("other", SymbolKind::Variable, false, (5, 1), (5, 6)),
    );

    Arc::new(Project::from_parts(
        PathBuf::from("/proj"),
        paths,
        symbols,
    ))
}

fn run(message: QueryMessage, project: Arc<Project>, connection: &mut Recorder) -> i32 {
    let options = JobOptions {
        quote_output: message.has(QueryFlags::QUOTE),
        ..Default::default()
    };
    let mut exec = executor_for(&message.kind);
    let mut job = QueryJob::new(message, options, project).unwrap();
    job.run(exec.as_mut(), connection)
}

fn find_all() -> QueryMessage {
    // every symbol name contains the empty pattern
    QueryMessage::new(QueryKind::FindSymbols {
        pattern: String::new(),
    })
}

#[test]
fn find_symbols_streams_in_table_order() {
    let mut conn = Recorder::default();
    let code = run(find_all(), sample_project(), &mut conn);
    assert_eq!(code, EXIT_OK);
    assert_eq!(
        conn.lines,
        vec![
            "src/a.cpp:5:1:",
            "src/a.cpp:10:1:",
            "src/a.cpp:20:5:",
            "src/a.cpp:25:2:",
            "src/a.cpp:40:1:",
            "src/b.cpp:5:1:",
        ]
    );
}

#[test]
fn containing_function_annotates_from_enclosing_definition() {
    let mut message = QueryMessage::new(QueryKind::FindSymbols {
        pattern: "use_site".to_string(),
    });
    message.flags.set(QueryFlags::CONTAINING_FUNCTION);
    let mut conn = Recorder::default();
    assert_eq!(run(message, sample_project(), &mut conn), EXIT_OK);
    assert_eq!(conn.lines, vec!["src/a.cpp:25:2:\tfunction: outer"]);
}

#[test]
fn containing_function_skips_the_entry_itself() {
    // the line-40 entry is itself a containing definition, but only
    // predecessors count, so the line-10 function wins
    let mut message = QueryMessage::new(QueryKind::FindSymbols {
        pattern: "inner".to_string(),
    });
    message.flags.set(QueryFlags::CONTAINING_FUNCTION);
    let mut conn = Recorder::default();
    assert_eq!(run(message, sample_project(), &mut conn), EXIT_OK);
    assert_eq!(conn.lines, vec!["src/a.cpp:40:1:\tfunction: outer"]);
}

#[test]
fn containing_function_misses_before_the_first_definition() {
    // line 5 precedes every definition; the scan reaches the table start
    let mut message = QueryMessage::new(QueryKind::FindSymbols {
        pattern: "early".to_string(),
    });
    message.flags.set(QueryFlags::CONTAINING_FUNCTION);
    let mut conn = Recorder::default();
    assert_eq!(run(message, sample_project(), &mut conn), EXIT_OK);
    assert_eq!(conn.lines, vec!["src/a.cpp:5:1:"]);
}

#[test]
fn containing_function_stops_at_file_boundary() {
    // src/b.cpp has no definitions; the scan must not cross into src/a.cpp
    let mut message = QueryMessage::new(QueryKind::FindSymbols {
        pattern: "other".to_string(),
    });
    message.flags.set(QueryFlags::CONTAINING_FUNCTION);
    let mut conn = Recorder::default();
    assert_eq!(run(message, sample_project(), &mut conn), EXIT_OK);
    assert_eq!(conn.lines, vec!["src/b.cpp:5:1:"]);
}

#[test]
fn annotation_suffixes_come_in_fixed_order() {
    let mut message = QueryMessage::new(QueryKind::FindSymbols {
        pattern: "use_site".to_string(),
    });
    message.flags.set(QueryFlags::DISPLAY_NAME);
    message.flags.set(QueryFlags::CURSOR_KIND);
    message.flags.set(QueryFlags::CONTAINING_FUNCTION);
    let mut conn = Recorder::default();
    assert_eq!(run(message, sample_project(), &mut conn), EXIT_OK);
    assert_eq!(
        conn.lines,
        vec!["src/a.cpp:25:2:\tuse_site()\tvariable\tfunction: outer"]
    );
}

#[test]
fn line_range_rejections_do_not_stop_the_scan() {
    let mut message = find_all();
    message.line_range = Some((8, 22));
    let mut conn = Recorder::default();
    assert_eq!(run(message, sample_project(), &mut conn), EXIT_OK);
    // lines 5, 25, 40 in a.cpp and 5 in b.cpp fall outside the range
    assert_eq!(conn.lines, vec!["src/a.cpp:10:1:", "src/a.cpp:20:5:"]);
}

#[test]
fn max_caps_the_stream_without_error() {
    let mut message = find_all();
    message.max = Some(2);
    let mut conn = Recorder::default();
    assert_eq!(run(message, sample_project(), &mut conn), EXIT_OK);
    assert_eq!(conn.lines, vec!["src/a.cpp:5:1:", "src/a.cpp:10:1:"]);
    // the executor stopped scanning once the cap was reached
    assert_eq!(conn.attempts, 2);
}

#[test]
fn single_literal_filter_narrows_the_scan_to_one_file() {
    let mut message = find_all();
    message.path_filters = vec!["src/b.cpp".to_string()];
    let mut conn = Recorder::default();
    assert_eq!(run(message, sample_project(), &mut conn), EXIT_OK);
    assert_eq!(conn.lines, vec!["src/b.cpp:5:1:"]);
    // only the narrowed file's entries were ever attempted
    assert_eq!(conn.attempts, 1);
}

#[test]
fn prefix_filters_apply_to_emitted_lines() {
    let mut message = find_all();
    message.path_filters = vec!["src/a.cpp".to_string(), "src/c.cpp".to_string()];
    let mut conn = Recorder::default();
    assert_eq!(run(message, sample_project(), &mut conn), EXIT_OK);
    assert_eq!(conn.lines.len(), 5);
    assert!(conn.lines.iter().all(|l| l.starts_with("src/a.cpp:")));
}

#[test]
fn pattern_filters_match_anywhere_in_the_line() {
    let mut message = find_all();
    message.path_filters = vec![r"b\.cpp".to_string()];
    message.flags.set(QueryFlags::MATCH_REGEX);
    let mut conn = Recorder::default();
    assert_eq!(run(message, sample_project(), &mut conn), EXIT_OK);
    assert_eq!(conn.lines, vec!["src/b.cpp:5:1:"]);
}

#[test]
fn quoted_stream_wraps_every_line() {
    let mut message = QueryMessage::new(QueryKind::ListFile {
        path: PathBuf::from("src/b.cpp"),
    });
    message.flags.set(QueryFlags::QUOTE);
    let mut conn = Recorder::default();
    assert_eq!(run(message, sample_project(), &mut conn), EXIT_OK);
    assert_eq!(conn.lines, vec!["\"src/b.cpp:5:1:\tother()\tvariable\""]);
}

#[test]
fn failed_send_aborts_the_run_and_stops_the_executor() {
    let mut conn = Recorder {
        fail_from: Some(0),
        ..Default::default()
    };
    let code = run(find_all(), sample_project(), &mut conn);
    assert_eq!(code, EXIT_ABORTED);
    assert!(conn.lines.is_empty());
    // the executor issued no further writes after the failure
    assert_eq!(conn.attempts, 1);
}

#[test]
fn symbol_info_reports_one_record() {
    let message = QueryMessage::new(QueryKind::SymbolInfo {
        path: PathBuf::from("src/a.cpp"),
        line: 10,
        column: 1,
    });
    let mut conn = Recorder::default();
    assert_eq!(run(message, sample_project(), &mut conn), EXIT_OK);
    assert_eq!(conn.lines, vec!["src/a.cpp:10:1:\touter()\tfunction\tdef"]);
}

#[test]
fn unknown_targets_report_not_found() {
    let missing_file = QueryMessage::new(QueryKind::SymbolInfo {
        path: PathBuf::from("src/zzz.cpp"),
        line: 1,
        column: 1,
    });
    let mut conn = Recorder::default();
    assert_eq!(run(missing_file, sample_project(), &mut conn), EXIT_NOT_FOUND);

    let missing_entry = QueryMessage::new(QueryKind::SymbolInfo {
        path: PathBuf::from("src/a.cpp"),
        line: 99,
        column: 1,
    });
    let mut conn = Recorder::default();
    assert_eq!(run(missing_entry, sample_project(), &mut conn), EXIT_NOT_FOUND);
    assert!(conn.lines.is_empty());
}

#[test]
fn repeated_runs_stream_identical_lines() {
    // a fresh job per run; daemon mode and direct mode share this path
    let mut message = find_all();
    message.flags.set(QueryFlags::CONTAINING_FUNCTION);
    let project = sample_project();

    let mut first = Recorder::default();
    let mut second = Recorder::default();
    assert_eq!(run(message.clone(), Arc::clone(&project), &mut first), EXIT_OK);
    assert_eq!(run(message, project, &mut second), EXIT_OK);
    assert_eq!(first.lines, second.lines);
}

#[test]
fn loads_a_database_from_disk_and_serves_it() {
    let dir = tempfile::tempdir().unwrap();
    let db_dir = dir.path().join(".symq");
    std::fs::create_dir_all(&db_dir).unwrap();
    std::fs::write(
        db_dir.join("symbols.json"),
        r#"{
            "version": 1,
            "files": ["src/parse.cpp"],
            "symbols": [
                [
                    {"file_id": 1, "line": 3, "column": 1},
                    {
                        "symbol_name": "parse",
                        "display_name": "parse(const char *)",
                        "kind": "function",
                        "is_definition": true,
                        "start_line": 3, "start_column": 1,
                        "end_line": 9, "end_column": 1
                    }
                ],
                [
                    {"file_id": 1, "line": 5, "column": 9},
                    {
                        "symbol_name": "token",
                        "display_name": "token",
                        "kind": "variable",
                        "is_definition": true,
                        "start_line": 5, "start_column": 9,
                        "end_line": 5, "end_column": 14
                    }
                ]
            ]
        }"#,
    )
    .unwrap();

    let project = Arc::new(
        Project::load(dir.path(), Path::new(".symq/symbols.json")).unwrap(),
    );

    let mut message = QueryMessage::new(QueryKind::FindSymbols {
        pattern: "token".to_string(),
    });
    message.flags.set(QueryFlags::CONTAINING_FUNCTION);
    message.flags.set(QueryFlags::CURSOR_KIND);
    let mut conn = Recorder::default();
    assert_eq!(run(message, project, &mut conn), EXIT_OK);
    assert_eq!(
        conn.lines,
        vec!["src/parse.cpp:5:9:\tvariable\tfunction: parse"]
    );
}

#[test]
fn write_options_are_per_call_overrides() {
    // drive the bound job directly through a closure executor
    let project = sample_project();
    let mut message = find_all();
    message.max = Some(1);
    message.path_filters = vec!["never-matches/".to_string()];
    let mut job = QueryJob::new(
        message,
        JobOptions {
            quote_output: true,
            ..Default::default()
        },
        project,
    )
    .unwrap();

    let mut conn = Recorder::default();
    let mut exec = ExecFn(|bound: &mut symq::query::BoundJob<'_>| {
        // filtered out, but a silent success
        assert!(bound.write("unmatched line", WriteOptions::default()));
        let unfiltered = WriteOptions {
            unfiltered: true,
            dont_quote: true,
            ..Default::default()
        };
        assert!(bound.write("first", unfiltered));
        // cap refuses the second line; ignore_max pushes it through
        assert!(!bound.write("second", unfiltered));
        assert!(bound.write(
            "second",
            WriteOptions {
                unfiltered: true,
                dont_quote: true,
                ignore_max: true,
            }
        ));
        EXIT_OK
    });
    assert_eq!(job.run(&mut exec, &mut conn), EXIT_OK);
    assert_eq!(conn.lines, vec!["first", "second"]);
}
