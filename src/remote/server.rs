//! Serving remote runs.
//!
//! Each accepted connection carries one run. The run itself is synchronous and executes on the
//! blocking pool; what it writes is streamed back frame by frame while it runs.

use std::io::{self, Write};
use std::sync::Arc;

use specrun_core::OutputStream;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};

use super::protocol::{ClientMessage, ProtocolError, ProtocolVersion, ServerMessage, read_message, write_message};
use crate::runner::Runner;

/// The far end of a remote run.
pub trait RemoteRun: Send + Sync {
    /// Run with `argv`, writing the report to `out` and diagnostics to `err`. Returns the verdict.
    fn run(&self, argv: &[String], err: &mut dyn Write, out: &mut dyn OutputStream) -> bool;
}

/// Serves runs with a [`Runner`]; every run starts from a fresh configuration and world.
#[derive(Debug, Clone)]
pub struct RunService {
    runner: Runner,
}

impl RunService {
    pub fn new(runner: Runner) -> Self {
        Self { runner }
    }
}

impl RemoteRun for RunService {
    fn run(&self, argv: &[String], err: &mut dyn Write, out: &mut dyn OutputStream) -> bool {
        match self.runner.run(argv, err, out) {
            Ok(success) => success,
            Err(error) => {
                tracing::info!(%error, "remote run failed");
                let _ = writeln!(err, "{}", error);
                if let Some(help) = error.help() {
                    let _ = writeln!(err, "  help: {}", help);
                }
                false
            }
        }
    }
}

/// Accept connections until `shutdown` turns true (or its sender is dropped).
pub async fn serve(
    listener: TcpListener,
    service: Arc<dyn RemoteRun>,
    mut shutdown: watch::Receiver<bool>,
) -> io::Result<()> {
    if let Ok(address) = listener.local_addr() {
        tracing::info!(%address, "accepting remote runs");
    }
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(connection) => connection,
                    Err(error) => {
                        tracing::warn!(%error, "accept failed");
                        continue;
                    }
                };
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    if let Err(error) = handle_connection(stream, service).await {
                        tracing::warn!(%peer, %error, "remote run connection failed");
                    }
                });
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    tracing::info!("shutting down remote run server");
                    return Ok(());
                }
            }
        }
    }
}

async fn handle_connection(mut stream: TcpStream, service: Arc<dyn RemoteRun>) -> Result<(), ProtocolError> {
    let Some(ClientMessage::Run { version, argv }) = read_message::<_, ClientMessage>(&mut stream).await? else {
        return Ok(());
    };
    let version = match ProtocolVersion::negotiate(version) {
        Ok(version) => version,
        Err(error) => {
            tracing::warn!(%error, "rejecting remote run");
            let rejected = ServerMessage::Rejected {
                reason: error.to_string(),
            };
            return write_message(&mut stream, &rejected).await;
        }
    };
    write_message(&mut stream, &ServerMessage::Accepted { version }).await?;
    tracing::debug!(?argv, "starting remote run");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let worker = tokio::task::spawn_blocking(move || {
        let mut out = ChannelWriter::stdout(tx.clone());
        let mut err = ChannelWriter::stderr(tx);
        service.run(&argv, &mut err, &mut out)
    });

    // The channel closes once the run returns and drops both writers.
    while let Some(message) = rx.recv().await {
        write_message(&mut stream, &message).await?;
    }
    let success = match worker.await {
        Ok(success) => success,
        Err(error) => {
            tracing::warn!(%error, "remote run aborted");
            false
        }
    };
    write_message(&mut stream, &ServerMessage::Finished { success }).await
}

#[derive(Debug, Clone, Copy)]
enum Channel {
    Stdout,
    Stderr,
}

/// Forwards every write as one frame. Unbuffered, so it is always synchronous.
struct ChannelWriter {
    channel: Channel,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ChannelWriter {
    fn stdout(tx: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self {
            channel: Channel::Stdout,
            tx,
        }
    }

    fn stderr(tx: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self {
            channel: Channel::Stderr,
            tx,
        }
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let data = buf.to_vec();
        let message = match self.channel {
            Channel::Stdout => ServerMessage::Stdout { data },
            Channel::Stderr => ServerMessage::Stderr { data },
        };
        self.tx
            .send(message)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "remote client disconnected"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl OutputStream for ChannelWriter {
    fn sync(&self) -> Option<bool> {
        Some(true)
    }
}
