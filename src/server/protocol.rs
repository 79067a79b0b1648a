//! Protocol messages for client-daemon communication
//!
//! Uses a simple length-prefixed JSON protocol:
//! - 4 bytes (little-endian u32): message length
//! - N bytes: JSON-encoded message
//!
//! Unlike a batch request/response exchange, a `Query` answer is a stream:
//! zero or more `Line` messages followed by exactly one `Done` (or an
//! `Error` instead of the whole stream).

use crate::query::message::QueryMessage;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::PathBuf;

/// Upper bound on a single framed message
const MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;

/// Request from client to daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Execute one query against a project's symbol database
    Query {
        /// Root of the project whose database should answer the query
        project_root: PathBuf,
        message: QueryMessage,
    },

    /// Check daemon health and get stats
    Status,

    /// Graceful shutdown request
    Shutdown,

    /// Ping for connection testing
    Ping,
}

/// Response from daemon to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    /// One result line of a running query
    Line { text: String },

    /// Query finished; no further lines follow
    Done { code: i32 },

    /// Daemon status
    Status(StatusResponse),

    /// Shutdown acknowledged
    ShuttingDown,

    /// Pong response
    Pong,

    /// Error response
    Error { message: String },
}

/// Daemon status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Daemon uptime in seconds
    pub uptime_secs: u64,
    /// Number of symbol databases currently loaded
    pub projects_loaded: usize,
    /// Total symbols across all loaded databases
    pub total_symbols: usize,
    /// Total queries served
    pub queries_served: u64,
    /// Loaded project roots
    pub loaded_roots: Vec<PathBuf>,
}

/// Write a message to a stream with length prefix
pub fn write_message<W: Write>(writer: &mut W, msg: &impl Serialize) -> std::io::Result<()> {
    let json = serde_json::to_vec(msg)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    let len = json.len() as u32;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&json)?;
    writer.flush()?;

    Ok(())
}

/// Read a message from a stream with length prefix
pub fn read_message<R: Read, T: for<'de> Deserialize<'de>>(reader: &mut R) -> std::io::Result<T> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;

    if len > MAX_MESSAGE_BYTES {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Message too large",
        ));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;

    serde_json::from_slice(&buf).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::message::{QueryFlags, QueryKind};
    use std::io::Cursor;

    #[test]
    fn test_roundtrip_query_request() {
        let mut message = QueryMessage::new(QueryKind::FindSymbols {
            pattern: "parse".to_string(),
        });
        message.max = Some(50);
        message.path_filters = vec!["/src/".to_string()];
        message.flags.set(QueryFlags::CURSOR_KIND);

        let req = Request::Query {
            project_root: PathBuf::from("/home/user/project"),
            message: message.clone(),
        };

        let mut buf = Vec::new();
        write_message(&mut buf, &req).unwrap();

        let mut cursor = Cursor::new(buf);
        let decoded: Request = read_message(&mut cursor).unwrap();

        match decoded {
            Request::Query {
                project_root,
                message: decoded_message,
            } => {
                assert_eq!(project_root, PathBuf::from("/home/user/project"));
                assert_eq!(decoded_message, message);
            }
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_roundtrip_line_stream() {
        let mut buf = Vec::new();
        write_message(
            &mut buf,
            &Response::Line {
                text: "src/a.cpp:1:1:\tmain()\tfunction".to_string(),
            },
        )
        .unwrap();
        write_message(&mut buf, &Response::Line { text: String::new() }).unwrap();
        write_message(&mut buf, &Response::Done { code: 0 }).unwrap();

        let mut cursor = Cursor::new(buf);
        let first: Response = read_message(&mut cursor).unwrap();
        let second: Response = read_message(&mut cursor).unwrap();
        let third: Response = read_message(&mut cursor).unwrap();

        match first {
            Response::Line { text } => assert_eq!(text, "src/a.cpp:1:1:\tmain()\tfunction"),
            _ => panic!("Wrong variant"),
        }
        assert!(matches!(second, Response::Line { text } if text.is_empty()));
        assert!(matches!(third, Response::Done { code: 0 }));
    }

    #[test]
    fn test_oversized_message_is_refused() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(u32::MAX).to_le_bytes());
        buf.extend_from_slice(b"junk");
        let mut cursor = Cursor::new(buf);
        let result: std::io::Result<Response> = read_message(&mut cursor);
        assert!(result.is_err());
    }
}
