use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use symq::config::AppConfig;
use symq::index::types::LocationSpec;
use symq::index::Project;
use symq::output::StdoutConnection;
use symq::query::{executor_for, JobOptions, QueryFlags, QueryJob, QueryKind, QueryMessage};
use symq::server::{daemon, is_daemon_running, QueryClient};
use symq::{output, server};

#[derive(Parser)]
#[command(name = "symq")]
#[command(about = "Symbol index query daemon for source code navigation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find symbols whose name contains a pattern
    Find {
        pattern: String,

        #[command(flatten)]
        opts: QueryOpts,
    },
    /// Show the symbol record at a location (path:line[:column])
    Info {
        location: LocationSpec,

        #[command(flatten)]
        opts: QueryOpts,
    },
    /// List all symbols of an indexed file
    List {
        file: PathBuf,

        #[command(flatten)]
        opts: QueryOpts,
    },
    /// Manage the query daemon (keeps symbol databases warm)
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
}

#[derive(Subcommand)]
enum DaemonAction {
    /// Start the daemon in the background
    Start,
    /// Stop the running daemon
    Stop,
    /// Check daemon status
    Status,
    /// Run the daemon in the foreground (for debugging)
    Foreground,
}

#[derive(Args)]
struct QueryOpts {
    /// Project root containing the symbol database
    #[arg(short, long, default_value = ".")]
    project: PathBuf,

    /// Maximum number of result lines
    #[arg(short, long)]
    max: Option<u32>,

    /// Lowest line to report (used together with --max-line)
    #[arg(long, requires = "max_line")]
    min_line: Option<u32>,

    /// Highest line to report (used together with --min-line)
    #[arg(long, requires = "min_line")]
    max_line: Option<u32>,

    /// Only report lines starting with one of these path prefixes
    #[arg(short = 'F', long = "filter")]
    filters: Vec<String>,

    /// Treat --filter values as regular expressions
    #[arg(long)]
    regex_filters: bool,

    /// Drop results from the system include tree
    #[arg(long)]
    exclude_system: bool,

    /// Annotate locations with the enclosing function
    #[arg(short = 'f', long)]
    containing_function: bool,

    /// Annotate locations with the symbol kind
    #[arg(short = 'k', long)]
    kind: bool,

    /// Annotate locations with the symbol display name
    #[arg(short = 'n', long)]
    display_name: bool,

    /// Render numeric file ids instead of paths
    #[arg(long)]
    file_ids: bool,

    /// Quote output lines
    #[arg(short = 'q', long)]
    quote: bool,

    /// Suppress the daemon-side diagnostic echo
    #[arg(long)]
    silent: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = AppConfig::load()?;

    match cli.command {
        Commands::Find { pattern, opts } => {
            run_query(QueryKind::FindSymbols { pattern }, opts, &config)
        }
        Commands::Info { location, opts } => run_query(
            QueryKind::SymbolInfo {
                path: location.path,
                line: location.line,
                column: location.column,
            },
            opts,
            &config,
        ),
        Commands::List { file, opts } => run_query(QueryKind::ListFile { path: file }, opts, &config),
        Commands::Daemon { action } => handle_daemon_command(action, config),
    }
}

fn build_message(kind: QueryKind, opts: &QueryOpts) -> QueryMessage {
    let mut message = QueryMessage::new(kind);
    message.max = opts.max;
    if let (Some(min), Some(max)) = (opts.min_line, opts.max_line) {
        message.line_range = Some((min, max));
    }
    message.path_filters = opts.filters.clone();
    if opts.regex_filters {
        message.flags.set(QueryFlags::MATCH_REGEX);
    }
    if opts.exclude_system {
        message.flags.set(QueryFlags::FILTER_SYSTEM);
    }
    if opts.containing_function {
        message.flags.set(QueryFlags::CONTAINING_FUNCTION);
    }
    if opts.kind {
        message.flags.set(QueryFlags::CURSOR_KIND);
    }
    if opts.display_name {
        message.flags.set(QueryFlags::DISPLAY_NAME);
    }
    if opts.file_ids {
        message.flags.set(QueryFlags::KEY_FILE_IDS);
    }
    if opts.quote {
        message.flags.set(QueryFlags::QUOTE);
    }
    if opts.silent {
        message.flags.set(QueryFlags::SILENT);
    }
    message
}

fn run_query(kind: QueryKind, opts: QueryOpts, config: &AppConfig) -> Result<()> {
    let message = build_message(kind, &opts);
    let root = opts
        .project
        .canonicalize()
        .with_context(|| format!("invalid project root {}", opts.project.display()))?;

    let timeout = Duration::from_secs(config.connection_timeout_secs);
    let code = match QueryClient::connect(timeout) {
        Some(mut client) => {
            let mut stdout = output::stdout(true);
            client.query(&root, &message, |line| {
                let _ = output::print_line(&mut stdout, line);
            })?
        }
        // no daemon: load the database and run the query in-process
        None => run_query_direct(&root, message, config)?,
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn run_query_direct(root: &Path, message: QueryMessage, config: &AppConfig) -> Result<i32> {
    let project = Arc::new(Project::load(root, Path::new(&config.database_path))?);
    let options = JobOptions {
        quote_output: message.has(QueryFlags::QUOTE),
        ..Default::default()
    };
    let mut exec = executor_for(&message.kind);
    let mut job = QueryJob::new(message, options, project)?;
    let mut connection = StdoutConnection::new(true);
    Ok(job.run(exec.as_mut(), &mut connection))
}

fn handle_daemon_command(action: DaemonAction, config: AppConfig) -> Result<()> {
    match action {
        DaemonAction::Start => {
            if is_daemon_running() {
                println!("symqd is already running");
                return Ok(());
            }
            daemon::daemonize(config)?;
            println!("symqd started");
            Ok(())
        }
        DaemonAction::Stop => {
            if daemon::stop_daemon()? {
                println!("symqd stopped");
            } else {
                println!("symqd is not running");
            }
            Ok(())
        }
        DaemonAction::Status => {
            let timeout = Duration::from_secs(config.connection_timeout_secs);
            match QueryClient::connect(timeout) {
                Some(mut client) => {
                    let status = client.status()?;
                    println!("symqd: running on {}", server::get_socket_path().display());
                    println!("  uptime:          {}s", status.uptime_secs);
                    println!("  projects loaded: {}", status.projects_loaded);
                    println!("  total symbols:   {}", status.total_symbols);
                    println!("  queries served:  {}", status.queries_served);
                    for root in &status.loaded_roots {
                        println!("    {}", root.display());
                    }
                    Ok(())
                }
                None => {
                    println!("symqd is not running");
                    Ok(())
                }
            }
        }
        DaemonAction::Foreground => daemon::run_foreground(config),
    }
}
