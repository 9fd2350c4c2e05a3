use std::fmt;
use std::path::Path;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

use crate::error::{io_err, DaemonError};
use crate::paths::{DIAL_TIMEOUT, REPLY_BUF_LEN};

/// Single-byte reply acknowledging `sync` and `error`.
pub const ACK: u8 = 0;
/// Replies starting with this prefix are failures.
pub const ERROR_PREFIX: &str = "Error:";

/// Command tokens understood by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Status,
    Sync,
    Error,
    Stop,
}

impl Command {
    pub fn token(self) -> &'static str {
        match self {
            Command::Status => "status",
            Command::Sync => "sync",
            Command::Error => "error",
            Command::Stop => "stop",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "status" => Some(Command::Status),
            "sync" => Some(Command::Sync),
            "error" => Some(Command::Error),
            "stop" => Some(Command::Stop),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// A decoded, non-error daemon reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The daemon closed the connection without a payload: it has stopped.
    Stopped,
    /// Command accepted; nothing to print.
    Ack,
    /// Informational text to print verbatim.
    Message(String),
}

impl Reply {
    /// Classify the raw bytes read from the daemon.
    pub fn decode(bytes: &[u8]) -> Result<Self, DaemonError> {
        match bytes {
            [] => Ok(Reply::Stopped),
            [ACK] => Ok(Reply::Ack),
            _ => {
                let text = String::from_utf8_lossy(bytes).into_owned();
                if text.starts_with(ERROR_PREFIX) {
                    Err(DaemonError::Daemon(text))
                } else {
                    Ok(Reply::Message(text))
                }
            }
        }
    }
}

/// Send one command to the daemon listening on `socket` and decode its reply.
pub async fn send_command(socket: &Path, command: Command) -> Result<Reply, DaemonError> {
    send_token(socket, command.token()).await
}

/// Send a raw token. The daemon answers unknown tokens with an `Error:` reply.
pub async fn send_token(socket: &Path, token: &str) -> Result<Reply, DaemonError> {
    if !socket.exists() {
        return Err(DaemonError::NotStarted);
    }

    let dial = tokio::time::timeout(DIAL_TIMEOUT, UnixStream::connect(socket)).await;
    let mut stream = match dial {
        Ok(Ok(stream)) => stream,
        Ok(Err(source)) => {
            return Err(DaemonError::Dial {
                socket: socket.to_path_buf(),
                source,
            })
        }
        Err(_) => {
            return Err(DaemonError::Dial {
                socket: socket.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("no answer within {}s", DIAL_TIMEOUT.as_secs()),
                ),
            })
        }
    };

    stream
        .write_all(token.as_bytes())
        .await
        .map_err(DaemonError::Write)?;

    let mut reply = Vec::with_capacity(REPLY_BUF_LEN);
    (&mut stream)
        .take(REPLY_BUF_LEN as u64)
        .read_to_end(&mut reply)
        .await
        .map_err(DaemonError::Read)?;

    tracing::debug!(command = token, bytes = reply.len(), "daemon replied");
    Reply::decode(&reply)
}

/// Blocking wrapper around [`send_command`] for the synchronous CLI.
pub fn send_blocking(socket: &Path, command: Command) -> Result<Reply, DaemonError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(send_command(socket, command))
}
