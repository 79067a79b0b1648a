//! Query daemon plumbing.
//!
//! - `symqd` daemon: loads symbol databases, listens on a Unix socket,
//!   streams query results back line by line
//! - Client: connects to the socket, sends one query, consumes the stream
//! - Fallback: when no daemon is running, the CLI loads the database
//!   directly and runs the query in-process

mod client;
pub mod daemon;
pub mod protocol;

pub use client::{ClientError, ClientResult, QueryClient};

use std::path::PathBuf;

/// Get the socket path for the query daemon.
/// Uses a per-user runtime directory for security.
pub fn get_socket_path() -> PathBuf {
    // XDG_RUNTIME_DIR first (most secure, tmpfs-backed)
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join("symq.sock");
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".local").join("run").join("symq.sock");
    }

    // last resort: /tmp with user id
    let uid = unsafe { libc::getuid() };
    PathBuf::from(format!("/tmp/symq-{uid}.sock"))
}

/// Get the PID file path for the daemon.
pub fn get_pid_path() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join("symq.pid");
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".local").join("run").join("symq.pid");
    }

    let uid = unsafe { libc::getuid() };
    PathBuf::from(format!("/tmp/symq-{uid}.pid"))
}

/// Check if the daemon is running.
pub fn is_daemon_running() -> bool {
    let pid_path = get_pid_path();
    if !pid_path.exists() {
        return false;
    }

    if let Ok(pid_str) = std::fs::read_to_string(&pid_path)
        && let Ok(pid) = pid_str.trim().parse::<i32>()
    {
        // kill(pid, 0) probes for process existence
        return unsafe { libc::kill(pid, 0) == 0 };
    }

    false
}
