use std::io::{self, Write};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use specrun_core::OutputStream;
use thiserror::Error;
use tokio::net::{TcpSocket, TcpStream, lookup_host};

use crate::remote::protocol::{
    CURRENT_PROTOCOL_VERSION, ClientMessage, ProtocolError, ServerMessage, read_message, write_message,
};

pub const DEFAULT_DRB_HOST: &str = "127.0.0.1";
pub const DEFAULT_DRB_PORT: u16 = 8989;

/// Environment variable naming the server port when `--drb-port` is absent.
pub const DRB_PORT_ENV: &str = "SPECRUN_DRB";

/// `--drb-port`, else a numeric `env_value`, else [`DEFAULT_DRB_PORT`].
pub fn resolve_drb_port(explicit: Option<u16>, env_value: Option<&str>) -> u16 {
    explicit
        .or_else(|| env_value.and_then(|value| value.trim().parse().ok()))
        .unwrap_or(DEFAULT_DRB_PORT)
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("No server is running")]
    Unavailable,

    #[error("server rejected the run: {0}")]
    Rejected(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("cannot start a remote run from inside an async runtime")]
    InsideRuntime,

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Forwards a run to a server and relays its output.
#[derive(Debug, Clone)]
pub struct RemoteProxyExecutor {
    argv: Vec<String>,
    host: String,
    port: u16,
}

impl RemoteProxyExecutor {
    pub fn new(argv: Vec<String>, port: u16) -> Self {
        Self {
            argv,
            host: DEFAULT_DRB_HOST.to_string(),
            port,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Run remotely, blocking until the server finishes. Returns the server's verdict; any
    /// failure to reach the server or to complete the exchange is written to `err` and yields false.
    ///
    /// Must not be called from a thread that is already driving a tokio runtime (for example a
    /// served run on the blocking pool); that is reported as [`RemoteError::InsideRuntime`]. Use
    /// [`RemoteProxyExecutor::invoke`] there.
    pub fn run(&self, err: &mut dyn Write, out: &mut dyn OutputStream) -> bool {
        if tokio::runtime::Handle::try_current().is_ok() {
            tracing::warn!(host = %self.host, port = self.port, "remote run requested inside a runtime");
            let _ = writeln!(err, "{}", RemoteError::InsideRuntime);
            return false;
        }
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(runtime) => runtime,
            Err(error) => {
                let _ = writeln!(err, "{}", error);
                return false;
            }
        };
        match runtime.block_on(self.invoke(err, out)) {
            Ok(success) => success,
            Err(error) => {
                if !matches!(error, RemoteError::Unavailable) {
                    tracing::warn!(host = %self.host, port = self.port, %error, "remote run failed");
                }
                let _ = writeln!(err, "{}", error);
                false
            }
        }
    }

    /// Perform the exchange on the current runtime.
    pub async fn invoke(&self, err: &mut dyn Write, out: &mut dyn OutputStream) -> Result<bool, RemoteError> {
        let mut stream = self.connect().await?;
        let request = ClientMessage::Run {
            version: CURRENT_PROTOCOL_VERSION.into(),
            argv: self.argv.clone(),
        };
        write_message(&mut stream, &request).await?;

        match read_message::<_, ServerMessage>(&mut stream).await? {
            Some(ServerMessage::Accepted { version }) => {
                tracing::debug!(?version, argv = ?self.argv, "remote run accepted");
            }
            Some(ServerMessage::Rejected { reason }) => return Err(RemoteError::Rejected(reason)),
            Some(other) => return Err(ProtocolError::UnexpectedMessage(format!("{:?}", other)).into()),
            None => return Err(ProtocolError::ConnectionClosed.into()),
        }

        loop {
            match read_message::<_, ServerMessage>(&mut stream).await? {
                Some(ServerMessage::Stdout { data }) => out.write_all(&data)?,
                Some(ServerMessage::Stderr { data }) => err.write_all(&data)?,
                Some(ServerMessage::Finished { success }) => {
                    out.flush()?;
                    return Ok(success);
                }
                Some(other) => return Err(ProtocolError::UnexpectedMessage(format!("{:?}", other)).into()),
                None => return Err(ProtocolError::ConnectionClosed.into()),
            }
        }
    }

    async fn connect(&self) -> Result<TcpStream, RemoteError> {
        let remote = lookup_host((self.host.as_str(), self.port))
            .await?
            .next()
            .ok_or(RemoteError::Unavailable)?;
        let socket = if remote.is_ipv6() {
            TcpSocket::new_v6()?
        } else {
            TcpSocket::new_v4()?
        };
        socket.bind(local_endpoint(remote.is_ipv6()).await)?;
        socket.connect(remote).await.map_err(|error| match error.kind() {
            io::ErrorKind::ConnectionRefused => RemoteError::Unavailable,
            _ => RemoteError::Io(error),
        })
    }
}

/// An ephemeral port on `localhost`, or on the loopback literal when `localhost` does not resolve
/// to the wanted family.
async fn local_endpoint(ipv6: bool) -> SocketAddr {
    let resolved = match lookup_host("localhost:0").await {
        Ok(mut addresses) => addresses.find(|address| address.is_ipv6() == ipv6),
        Err(error) => {
            tracing::debug!(%error, "localhost does not resolve; binding the loopback address");
            None
        }
    };
    resolved.unwrap_or_else(|| {
        if ipv6 {
            SocketAddr::from((Ipv6Addr::LOCALHOST, 0))
        } else {
            SocketAddr::from((Ipv4Addr::LOCALHOST, 0))
        }
    })
}
