//! Query daemon
//!
//! Keeps symbol databases loaded in memory and serves queries over a Unix
//! socket. The daemon is the runner of the streaming core: for every `Query`
//! request it constructs a [`QueryJob`], binds the socket-backed connection
//! to it for one run, and forwards the executor's exit code to the client.

use crate::config::AppConfig;
use crate::index::project::Project;
use crate::query::exec::executor_for;
use crate::query::job::{Connection, JobOptions, QueryJob};
use crate::query::message::{QueryFlags, QueryMessage};
use crate::server::protocol::{read_message, write_message, Request, Response, StatusResponse};
use crate::server::{get_pid_path, get_socket_path};
use anyhow::{Context, Result};
use log::{info, warn};
use std::collections::HashMap;
use std::fs;
use std::io::{BufReader, BufWriter};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, Instant};

/// Statistics for the daemon
struct ServerStats {
    start_time: Instant,
    queries_served: AtomicU64,
}

impl ServerStats {
    fn new() -> Self {
        Self {
            start_time: Instant::now(),
            queries_served: AtomicU64::new(0),
        }
    }
}

/// The query daemon
pub struct QueryServer {
    /// Loaded symbol databases by canonical project root
    projects: RwLock<HashMap<PathBuf, Arc<Project>>>,
    config: AppConfig,
    stats: ServerStats,
    shutdown: AtomicBool,
}

impl QueryServer {
    /// Create a new query server wrapped in Arc
    pub fn new(config: AppConfig) -> Arc<Self> {
        Arc::new(Self {
            projects: RwLock::new(HashMap::new()),
            config,
            stats: ServerStats::new(),
            shutdown: AtomicBool::new(false),
        })
    }

    /// Start the daemon (blocking)
    pub fn run(self: &Arc<Self>) -> Result<()> {
        let socket_path = get_socket_path();
        let pid_path = get_pid_path();

        if let Some(parent) = socket_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Remove stale socket file
        if socket_path.exists() {
            fs::remove_file(&socket_path)?;
        }

        fs::write(&pid_path, format!("{}", std::process::id()))?;

        let listener = UnixListener::bind(&socket_path)
            .with_context(|| format!("failed to bind to {}", socket_path.display()))?;

        // Socket permissions: user only
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&socket_path, fs::Permissions::from_mode(0o600))?;
        }

        info!("symqd: listening on {}", socket_path.display());

        let timeout = Duration::from_secs(self.config.connection_timeout_secs);
        for stream in listener.incoming() {
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }

            match stream {
                Ok(stream) => {
                    let _ = stream.set_read_timeout(Some(timeout));
                    let _ = stream.set_write_timeout(Some(timeout));

                    let server = Arc::clone(self);
                    thread::spawn(move || {
                        if let Err(e) = server.handle_connection(stream) {
                            warn!("symqd: connection error: {e}");
                        }
                    });
                }
                Err(e) => {
                    warn!("symqd: accept error: {e}");
                }
            }
        }

        let _ = fs::remove_file(&socket_path);
        let _ = fs::remove_file(&pid_path);

        Ok(())
    }

    /// Handle a single client connection
    fn handle_connection(&self, stream: UnixStream) -> Result<()> {
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut writer = BufWriter::new(stream);

        loop {
            let request: Request = match read_message(&mut reader) {
                Ok(req) => req,
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    // client disconnected
                    break;
                }
                Err(e) => {
                    let resp = Response::Error {
                        message: format!("invalid request: {e}"),
                    };
                    write_message(&mut writer, &resp)?;
                    continue;
                }
            };

            match request {
                Request::Query {
                    project_root,
                    message,
                } => self.handle_query(&mut writer, project_root, message)?,

                Request::Status => write_message(&mut writer, &self.handle_status())?,

                Request::Shutdown => {
                    self.shutdown.store(true, Ordering::Relaxed);
                    write_message(&mut writer, &Response::ShuttingDown)?;
                    break;
                }

                Request::Ping => write_message(&mut writer, &Response::Pong)?,
            }
        }

        Ok(())
    }

    /// Run one query, streaming its result lines back to the client.
    fn handle_query(
        &self,
        writer: &mut BufWriter<UnixStream>,
        project_root: PathBuf,
        message: QueryMessage,
    ) -> Result<()> {
        let root = match project_root.canonicalize() {
            Ok(p) => p,
            Err(e) => {
                let resp = Response::Error {
                    message: format!("invalid project root: {e}"),
                };
                write_message(writer, &resp)?;
                return Ok(());
            }
        };

        let project = match self.ensure_project_loaded(&root) {
            Ok(p) => p,
            Err(e) => {
                let resp = Response::Error {
                    message: format!("failed to load symbol database: {e:#}"),
                };
                write_message(writer, &resp)?;
                return Ok(());
            }
        };

        let options = JobOptions {
            quote_output: message.has(QueryFlags::QUOTE),
            ..Default::default()
        };
        let mut exec = executor_for(&message.kind);
        let mut job = match QueryJob::new(message, options, project) {
            Ok(job) => job,
            Err(e) => {
                let resp = Response::Error {
                    message: format!("bad query: {e:#}"),
                };
                write_message(writer, &resp)?;
                return Ok(());
            }
        };

        let code = {
            let mut connection = StreamConnection { writer };
            job.run(exec.as_mut(), &mut connection)
        };
        self.stats.queries_served.fetch_add(1, Ordering::Relaxed);

        if job.aborted() {
            // the client is gone; there is nobody left to send Done to
            warn!("symqd: query aborted, client hung up mid-stream");
            return Ok(());
        }
        write_message(writer, &Response::Done { code })?;
        Ok(())
    }

    /// Daemon status snapshot
    fn handle_status(&self) -> Response {
        let projects = self.projects.read().unwrap();
        let total_symbols = projects.values().map(|p| p.symbols().len()).sum();
        let loaded_roots: Vec<PathBuf> = projects.keys().cloned().collect();

        Response::Status(StatusResponse {
            uptime_secs: self.stats.start_time.elapsed().as_secs(),
            projects_loaded: projects.len(),
            total_symbols,
            queries_served: self.stats.queries_served.load(Ordering::Relaxed),
            loaded_roots,
        })
    }

    /// Ensure a project's symbol database is loaded
    fn ensure_project_loaded(&self, root: &Path) -> Result<Arc<Project>> {
        // check with read lock first
        {
            let projects = self.projects.read().unwrap();
            if let Some(project) = projects.get(root) {
                return Ok(Arc::clone(project));
            }
        }

        let mut projects = self.projects.write().unwrap();

        // double-check after acquiring write lock
        if let Some(project) = projects.get(root) {
            return Ok(Arc::clone(project));
        }

        info!("symqd: loading symbol database for {}", root.display());
        let project = Arc::new(Project::load(
            root,
            Path::new(&self.config.database_path),
        )?);
        info!(
            "symqd: loaded {} symbols across {} files from {}",
            project.symbols().len(),
            project.paths().len(),
            root.display()
        );
        projects.insert(root.to_path_buf(), Arc::clone(&project));

        Ok(project)
    }
}

/// Adapts the framed response writer to the job's output sink. A framing
/// or transport error surfaces as a failed send, which aborts the job.
struct StreamConnection<'a> {
    writer: &'a mut BufWriter<UnixStream>,
}

impl Connection for StreamConnection<'_> {
    fn write_line(&mut self, line: &str) -> bool {
        write_message(
            self.writer,
            &Response::Line {
                text: line.to_string(),
            },
        )
        .is_ok()
    }
}

/// Daemonize the current process
pub fn daemonize(config: AppConfig) -> Result<()> {
    // double-fork so the daemon cannot reacquire a controlling terminal
    match unsafe { libc::fork() } {
        -1 => anyhow::bail!("first fork failed"),
        0 => {
            if unsafe { libc::setsid() } == -1 {
                anyhow::bail!("setsid failed");
            }

            match unsafe { libc::fork() } {
                -1 => anyhow::bail!("second fork failed"),
                0 => {
                    // grandchild: this becomes the daemon
                    unsafe {
                        libc::close(0);
                        libc::close(1);
                        libc::close(2);

                        let null = libc::open(c"/dev/null".as_ptr(), libc::O_RDWR);
                        if null != -1 {
                            libc::dup2(null, 0);
                            libc::dup2(null, 1);
                            libc::dup2(null, 2);
                            if null > 2 {
                                libc::close(null);
                            }
                        }
                    }

                    // avoid holding mounts
                    let _ = std::env::set_current_dir("/");

                    let server = QueryServer::new(config);
                    if let Err(e) = server.run() {
                        // stdout/stderr are closed by now
                        let _ = fs::write("/tmp/symqd-error.log", format!("{e:#}"));
                    }
                    std::process::exit(0);
                }
                _ => {
                    // first child exits immediately
                    std::process::exit(0);
                }
            }
        }
        _ => {
            // parent: reap the first child, then return
            unsafe {
                let mut status: libc::c_int = 0;
                libc::wait(&mut status);
            }
            Ok(())
        }
    }
}

/// Run the daemon in the foreground (for debugging)
pub fn run_foreground(config: AppConfig) -> Result<()> {
    let server = QueryServer::new(config);
    server.run()
}

/// Stop the running daemon
pub fn stop_daemon() -> Result<bool> {
    let pid_path = get_pid_path();

    if !pid_path.exists() {
        return Ok(false);
    }

    let pid_str = fs::read_to_string(&pid_path)?;
    let pid: i32 = pid_str.trim().parse()?;

    // SIGTERM first, SIGKILL if it lingers
    unsafe {
        if libc::kill(pid, libc::SIGTERM) == 0 {
            thread::sleep(Duration::from_millis(500));

            if libc::kill(pid, 0) == 0 {
                thread::sleep(Duration::from_secs(1));
                if libc::kill(pid, 0) == 0 {
                    libc::kill(pid, libc::SIGKILL);
                }
            }
        }
    }

    let socket_path = get_socket_path();
    let _ = fs::remove_file(&socket_path);
    let _ = fs::remove_file(&pid_path);

    Ok(true)
}
