//! Client for connecting to the query daemon

use crate::query::message::QueryMessage;
use crate::server::get_socket_path;
use crate::server::protocol::{read_message, write_message, Request, Response, StatusResponse};
use std::io::{BufReader, BufWriter};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in client operations
#[derive(Debug)]
pub enum ClientError {
    /// Daemon is not running
    NotRunning,
    /// Communication error
    Io(std::io::Error),
    /// Daemon returned an error
    Daemon(String),
    /// Response did not fit the request
    UnexpectedResponse,
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::NotRunning => write!(f, "query daemon is not running"),
            ClientError::Io(e) => write!(f, "I/O error: {e}"),
            ClientError::Daemon(msg) => write!(f, "daemon error: {msg}"),
            ClientError::UnexpectedResponse => write!(f, "unexpected response from daemon"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Io(e)
    }
}

/// Client for the query daemon
pub struct QueryClient {
    reader: BufReader<UnixStream>,
    writer: BufWriter<UnixStream>,
}

impl QueryClient {
    /// Try to connect to the running daemon.
    /// Returns None if the daemon is not running (allowing fallback to
    /// direct in-process execution).
    pub fn connect(timeout: Duration) -> Option<Self> {
        let socket_path = get_socket_path();

        if !socket_path.exists() {
            return None;
        }

        let stream = match UnixStream::connect(&socket_path) {
            Ok(s) => s,
            Err(_) => return None,
        };

        let _ = stream.set_read_timeout(Some(timeout));
        let _ = stream.set_write_timeout(Some(timeout));

        let reader = BufReader::new(stream.try_clone().ok()?);
        let writer = BufWriter::new(stream);

        Some(Self { reader, writer })
    }

    /// Connect or return an error (for when the daemon is required)
    pub fn connect_required(timeout: Duration) -> ClientResult<Self> {
        Self::connect(timeout).ok_or(ClientError::NotRunning)
    }

    /// Execute a query, invoking `on_line` for every streamed result line.
    /// Returns the query's exit code once the stream finishes.
    pub fn query(
        &mut self,
        project_root: &Path,
        message: &QueryMessage,
        mut on_line: impl FnMut(&str),
    ) -> ClientResult<i32> {
        let request = Request::Query {
            project_root: project_root.to_path_buf(),
            message: message.clone(),
        };

        write_message(&mut self.writer, &request)?;

        loop {
            let response: Response = read_message(&mut self.reader)?;
            match response {
                Response::Line { text } => on_line(&text),
                Response::Done { code } => return Ok(code),
                Response::Error { message } => return Err(ClientError::Daemon(message)),
                _ => return Err(ClientError::UnexpectedResponse),
            }
        }
    }

    /// Get daemon status
    pub fn status(&mut self) -> ClientResult<StatusResponse> {
        write_message(&mut self.writer, &Request::Status)?;

        let response: Response = read_message(&mut self.reader)?;

        match response {
            Response::Status(status) => Ok(status),
            Response::Error { message } => Err(ClientError::Daemon(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Request graceful shutdown
    pub fn shutdown(&mut self) -> ClientResult<()> {
        write_message(&mut self.writer, &Request::Shutdown)?;

        let response: Response = read_message(&mut self.reader)?;

        match response {
            Response::ShuttingDown => Ok(()),
            Response::Error { message } => Err(ClientError::Daemon(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Ping the daemon
    pub fn ping(&mut self) -> ClientResult<()> {
        write_message(&mut self.writer, &Request::Ping)?;

        let response: Response = read_message(&mut self.reader)?;

        match response {
            Response::Pong => Ok(()),
            Response::Error { message } => Err(ClientError::Daemon(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }
}
