use std::fs;
use std::future::Future;
use std::io::ErrorKind;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};

use simulator_core::TriggerEvent;

use crate::engine::Engine;
use crate::error::{io_err, DaemonError};
use crate::paths::{session_log_path, socket_path, COMMAND_BUF_LEN};
use crate::protocol::{Command, ACK, ERROR_PREFIX};
use crate::session::SessionLog;

/// Reply sent for every command but `stop` once the sync directory is gone.
pub const MISSING_DIR_REPLY: &str = "Error: Indicated directory does not exist";

/// Where the daemon listens and which directory it pretends to synchronize.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub socket: PathBuf,
    pub sync_dir: PathBuf,
}

impl DaemonConfig {
    /// Listen on the shared endpoint in the temp directory.
    pub fn new(sync_dir: PathBuf) -> Self {
        Self {
            socket: socket_path(),
            sync_dir,
        }
    }
}

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(sync_dir: &Path) -> Result<(), DaemonError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(DaemonConfig::new(sync_dir.to_path_buf())))
}

/// Run the daemon until `stop`, SIGINT or SIGTERM.
pub async fn run(config: DaemonConfig) -> Result<(), DaemonError> {
    let log = SessionLog::open(&session_log_path(&config.sync_dir))?;
    let endpoint = Endpoint::bind(&config.socket)?;
    tracing::info!(
        socket = %config.socket.display(),
        sync_dir = %config.sync_dir.display(),
        pid = std::process::id(),
        "daemon started",
    );

    let engine = Engine::new(config.sync_dir, log);
    engine.trigger(TriggerEvent::Start).await;

    let result = serve(endpoint, &engine, shutdown_signal()).await;
    engine.shutdown().await;
    match &result {
        Ok(()) => tracing::info!("daemon stopped"),
        Err(err) => tracing::error!(error = %err, "daemon stopped with error"),
    }
    result
}

/// A bound command endpoint. The socket file is removed when this is dropped.
#[derive(Debug)]
pub struct Endpoint {
    listener: UnixListener,
    path: PathBuf,
}

impl Endpoint {
    /// Bind `path`, reclaiming it if a previous daemon left it behind.
    ///
    /// Fails with [`DaemonError::AddressInUse`] when another daemon answers on it.
    pub fn bind(path: &Path) -> Result<Self, DaemonError> {
        prepare_socket_for_bind(path)?;

        let listener = UnixListener::bind(path).map_err(|e| match e.kind() {
            ErrorKind::AddrInUse => DaemonError::AddressInUse {
                socket: path.to_path_buf(),
            },
            _ => io_err(path, e),
        })?;
        let endpoint = Self {
            listener,
            path: path.to_path_buf(),
        };
        set_socket_permissions(&endpoint.path)?;

        tracing::debug!(socket = %path.display(), "endpoint bound");
        Ok(endpoint)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(socket = %self.path.display(), "endpoint removed"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => tracing::warn!(
                socket = %self.path.display(),
                error = %err,
                "failed to remove endpoint",
            ),
        }
    }
}

enum Flow {
    Continue,
    /// `stop` was received; the stream is closed only after the endpoint is gone.
    Stop(UnixStream),
}

/// Accept connections one at a time until `stop` or `shutdown` resolves.
///
/// The endpoint is consumed: it is removed before the `stop` caller sees EOF.
pub async fn serve(
    endpoint: Endpoint,
    engine: &Engine,
    shutdown: impl Future<Output = ()>,
) -> Result<(), DaemonError> {
    tokio::pin!(shutdown);

    let stop_stream = loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("received shutdown signal");
                break None;
            }
            accepted = endpoint.listener.accept() => {
                let (stream, _) = accepted.map_err(|e| io_err(endpoint.path(), e))?;
                match handle_connection(stream, engine).await {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Stop(stream)) => break Some(stream),
                    Err(err) => tracing::warn!(error = %err, "connection failed"),
                }
            }
        }
    };

    engine.shutdown().await;
    drop(endpoint);
    drop(stop_stream);
    Ok(())
}

async fn handle_connection(mut stream: UnixStream, engine: &Engine) -> Result<Flow, DaemonError> {
    let mut buf = [0u8; COMMAND_BUF_LEN];
    let n = stream.read(&mut buf).await.map_err(DaemonError::Read)?;
    if n == 0 {
        tracing::debug!("liveness probe");
        return Ok(Flow::Continue);
    }

    let token = String::from_utf8_lossy(&buf[..n]).into_owned();
    let command = Command::parse(&token);
    tracing::info!(command = %token, "received command");

    let reply = match command {
        Some(Command::Stop) => return Ok(Flow::Stop(stream)),
        _ if !engine.sync_dir().is_dir() => MISSING_DIR_REPLY.as_bytes().to_vec(),
        Some(Command::Status) => engine.current_report().await.into_bytes(),
        Some(Command::Sync) => {
            engine.trigger(TriggerEvent::Sync).await;
            vec![ACK]
        }
        Some(Command::Error) => {
            engine.trigger(TriggerEvent::Error).await;
            vec![ACK]
        }
        None => format!("{ERROR_PREFIX} unknown command: '{token}'").into_bytes(),
    };

    stream.write_all(&reply).await.map_err(DaemonError::Write)?;
    Ok(Flow::Continue)
}

/// Resolves on SIGINT or SIGTERM. A handler that cannot be installed never fires.
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "ctrl-c handler failed");
            std::future::pending::<()>().await;
        }
    };
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "SIGTERM handler failed");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn prepare_socket_for_bind(socket: &Path) -> Result<(), DaemonError> {
    if !socket.exists() {
        return Ok(());
    }

    match StdUnixStream::connect(socket) {
        Ok(_) => {
            return Err(DaemonError::AddressInUse {
                socket: socket.to_path_buf(),
            });
        }
        Err(err) => {
            tracing::warn!(
                socket = %socket.display(),
                error = %err,
                "removing stale daemon socket before bind",
            );
        }
    }

    match fs::remove_file(socket) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(socket, err)),
    }
}

fn set_socket_permissions(path: &Path) -> Result<(), DaemonError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| io_err(path, e))
}
