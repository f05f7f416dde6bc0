//! Local HTTP listener that receives the OAuth 2.0 redirect.
//!
//! The listener binds the host and port of the configured redirect URI and
//! serves requests until one arrives on the redirect path. Requests to any
//! other path get a 404 and the wait continues. Each connection is served on
//! its own task and must deliver its request line and headers within a
//! per-connection deadline ([`CONNECTION_TIMEOUT`] by default), so an idle or half-open socket cannot hold up the
//! callback. The socket and every connection task are closed when
//! [`CallbackListener::wait`] returns, on every path.

use crate::error::{AuthError, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use url::Url;

const SUCCESS_PAGE: &str = "<html><body><h1>Authentication successful</h1>\
<p>You can close this window and return to the terminal.</p></body></html>";

const ERROR_PAGE: &str = "<html><body><h1>Authentication failed</h1>\
<p>Return to the terminal for details.</p></body></html>";

const MAX_HEADER_LINES: usize = 100;

/// Default time a single connection gets to send its request.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Parameters delivered on the redirect.
#[derive(Clone, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: String,
    pub state: String,
}

impl std::fmt::Debug for CallbackParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackParams")
            .field("code", &"[REDACTED]")
            .field("state", &self.state)
            .finish()
    }
}

enum Outcome {
    Done(Result<CallbackParams>),
    Ignored,
}

#[derive(Debug)]
pub struct CallbackListener {
    listener: TcpListener,
    path: Arc<str>,
    connection_timeout: Duration,
}

impl CallbackListener {
    /// Bind the address named by `redirect_uri`.
    ///
    /// `localhost` binds the IPv4 loopback address. A missing port falls
    /// back to the scheme default.
    pub async fn bind(redirect_uri: &str) -> Result<Self> {
        let url = Url::parse(redirect_uri)
            .map_err(|e| AuthError::InvalidUrl(format!("{}: {}", redirect_uri, e)))?;

        let host = match url.host_str() {
            Some("localhost") | None => "127.0.0.1",
            Some(host) => host.trim_start_matches('[').trim_end_matches(']'),
        };
        let port = url.port_or_known_default().ok_or_else(|| {
            AuthError::InvalidUrl(format!("{}: no port for scheme", redirect_uri))
        })?;

        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|e| AuthError::Listener(format!("bind {}:{}: {}", host, port, e)))?;

        let path: Arc<str> = match url.path() {
            "" => Arc::from("/"),
            p => Arc::from(p),
        };

        debug!(host, port, path = %path, "Callback listener bound");

        Ok(Self {
            listener,
            path,
            connection_timeout: CONNECTION_TIMEOUT,
        })
    }

    /// Override how long one connection may take to send its request.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| AuthError::Listener(e.to_string()))
    }

    /// Serve until the redirect arrives or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// - [`AuthError::OperationTimeout`] if nothing arrives in time
    /// - [`AuthError::AuthorizationDenied`] if the redirect carries `error`
    ///   or lacks `code`
    pub async fn wait(self, timeout: Duration) -> Result<CallbackParams> {
        match tokio::time::timeout(timeout, self.accept_loop()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    timeout_secs = timeout.as_secs(),
                    "No OAuth callback received"
                );
                Err(AuthError::OperationTimeout {
                    operation: "OAuth callback".to_string(),
                    timeout_secs: timeout.as_secs(),
                })
            }
        }
    }

    async fn accept_loop(&self) -> Result<CallbackParams> {
        let (tx, mut rx) = mpsc::channel::<Result<CallbackParams>>(1);
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer) =
                        accepted.map_err(|e| AuthError::Listener(e.to_string()))?;
                    debug!(%peer, "Callback connection accepted");

                    let path = Arc::clone(&self.path);
                    let deadline = self.connection_timeout;
                    let tx = tx.clone();
                    connections.spawn(async move {
                        match tokio::time::timeout(deadline, serve(stream, &path)).await {
                            Ok(Ok(Outcome::Done(result))) => {
                                // The receiver is gone once another connection won.
                                let _ = tx.send(result).await;
                            }
                            Ok(Ok(Outcome::Ignored)) => {}
                            Ok(Err(e)) => {
                                debug!(%peer, error = %e, "Dropping malformed callback connection");
                            }
                            Err(_) => debug!(%peer, "Dropping idle callback connection"),
                        }
                    });
                }
                Some(result) = rx.recv() => return result,
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }
    }
}

async fn serve(stream: TcpStream, callback_path: &str) -> std::io::Result<Outcome> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    // Drain headers up to the blank line.
    for _ in 0..MAX_HEADER_LINES {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await?;
        if n == 0 || line.trim_end().is_empty() {
            break;
        }
    }

    let target = request_line.split_whitespace().nth(1).unwrap_or("/");
    let url = match Url::parse("http://localhost").and_then(|base| base.join(target)) {
        Ok(url) => url,
        Err(_) => {
            respond(&mut writer, 400, "Bad Request", "").await?;
            return Ok(Outcome::Ignored);
        }
    };

    if url.path() != callback_path {
        respond(&mut writer, 404, "Not Found", "").await?;
        return Ok(Outcome::Ignored);
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        respond(&mut writer, 400, "Bad Request", ERROR_PAGE).await?;
        return Ok(Outcome::Done(Err(AuthError::AuthorizationDenied(error))));
    }

    match code {
        Some(code) if !code.is_empty() => {
            respond(&mut writer, 200, "OK", SUCCESS_PAGE).await?;
            Ok(Outcome::Done(Ok(CallbackParams {
                code,
                state: state.unwrap_or_default(),
            })))
        }
        _ => {
            respond(&mut writer, 400, "Bad Request", ERROR_PAGE).await?;
            Ok(Outcome::Done(Err(AuthError::AuthorizationDenied(
                "callback did not include an authorization code".to_string(),
            ))))
        }
    }
}

async fn respond<W>(writer: &mut W, status: u16, reason: &str, body: &str) -> std::io::Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    );
    writer.write_all(response.as_bytes()).await?;
    writer.shutdown().await
}
