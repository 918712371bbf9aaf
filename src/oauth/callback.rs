use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::error::AuthError;

const SUCCESS_HTML: &str = "<!DOCTYPE html><html><body><h1>Authentication successful!</h1>\
                            <p>You can close this window and return to the terminal.</p></body></html>";
const ERROR_HTML: &str = "<!DOCTYPE html><html><body><h1>Error</h1>\
                          <p>No authorization code received.</p></body></html>";
const NOT_FOUND_HTML: &str = "<!DOCTYPE html><html><body><h1>Not found</h1></body></html>";

const MAX_REQUEST_HEAD: usize = 8192;
/// Browsers open speculative connections that never send a request.
const CONNECTION_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// One-shot loopback listener for the OAuth redirect.
///
/// Binding puts it in the listening state; awaiting consumes it, so it
/// resolves exactly once and releases its socket on return.
#[derive(Debug)]
pub struct CallbackListener {
    listener: TcpListener,
    local_addr: SocketAddr,
    expected_path: String,
}

#[derive(Debug, PartialEq, Eq)]
enum CallbackOutcome {
    Code(String),
    Missing { provider_error: Option<String> },
    Unrelated,
}

impl CallbackListener {
    /// Bind the loopback address named by a redirect URI such as
    /// `http://localhost:3000/oauth2callback`.
    pub async fn bind(redirect_uri: &str) -> Result<Self, AuthError> {
        let (addr, path) = callback_address(redirect_uri)?;
        Self::bind_on(addr, &path).await
    }

    pub async fn bind_on(addr: SocketAddr, expected_path: &str) -> Result<Self, AuthError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| AuthError::ListenerBindError {
                addr: addr.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        tracing::debug!("Callback listener bound to {local_addr}");
        Ok(Self {
            listener,
            local_addr,
            expected_path: expected_path.to_string(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn expected_path(&self) -> &str {
        &self.expected_path
    }

    /// Wait for the redirect, giving up after `timeout` when one is set.
    pub async fn await_code(self, timeout: Option<Duration>) -> Result<String, AuthError> {
        match timeout {
            Some(limit) => self
                .await_code_until(tokio::time::sleep(limit))
                .await
                .map_err(|e| match e {
                    AuthError::ListenerCancelled(None) => AuthError::ListenerCancelled(Some(limit)),
                    other => other,
                }),
            None => self.await_code_until(std::future::pending::<()>()).await,
        }
    }

    /// Wait for the redirect until `cancel` completes.
    pub async fn await_code_until<F>(self, cancel: F) -> Result<String, AuthError>
    where
        F: Future<Output = ()>,
    {
        let result = tokio::select! {
            res = self.serve() => res,
            _ = cancel => Err(AuthError::ListenerCancelled(None)),
        };
        drop(self);
        result
    }

    async fn serve(&self) -> Result<String, AuthError> {
        loop {
            let (mut stream, peer) = self.listener.accept().await?;

            let request = match tokio::time::timeout(
                CONNECTION_READ_TIMEOUT,
                read_request_head(&mut stream),
            )
            .await
            {
                Ok(Ok(request)) if !request.is_empty() => request,
                Ok(Ok(_)) | Err(_) => {
                    tracing::debug!("Dropping idle callback connection from {peer}");
                    continue;
                }
                Ok(Err(e)) => {
                    tracing::debug!("Failed to read callback request from {peer}: {e}");
                    continue;
                }
            };

            match classify_request(&request, &self.expected_path) {
                CallbackOutcome::Code(code) => {
                    respond(&mut stream, "200 OK", SUCCESS_HTML).await;
                    return Ok(code);
                }
                CallbackOutcome::Missing { provider_error } => {
                    respond(&mut stream, "400 Bad Request", ERROR_HTML).await;
                    return Err(AuthError::NoCodeReceived(provider_error));
                }
                CallbackOutcome::Unrelated => {
                    respond(&mut stream, "404 Not Found", NOT_FOUND_HTML).await;
                }
            }
        }
    }
}

/// Socket address and path to listen on for a loopback redirect URI.
pub fn callback_address(redirect_uri: &str) -> Result<(SocketAddr, String), AuthError> {
    let invalid = |detail: String| AuthError::ConfigError {
        path: PathBuf::from("<redirect_uri>"),
        detail,
    };
    let url = Url::parse(redirect_uri)
        .map_err(|e| invalid(format!("Invalid redirect URI '{redirect_uri}': {e}")))?;

    if url.scheme() != "http" {
        return Err(invalid(format!(
            "Redirect URI '{redirect_uri}' must use http:// on a loopback address"
        )));
    }
    let host = url
        .host_str()
        .ok_or_else(|| invalid(format!("Redirect URI '{redirect_uri}' has no host")))?;
    let ip: IpAddr = if host.eq_ignore_ascii_case("localhost") {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    } else {
        host.trim_start_matches('[')
            .trim_end_matches(']')
            .parse()
            .map_err(|_| {
                invalid(format!(
                    "Redirect URI '{redirect_uri}' must point at a loopback address"
                ))
            })?
    };
    if !ip.is_loopback() {
        return Err(invalid(format!(
            "Redirect URI '{redirect_uri}' must point at a loopback address"
        )));
    }
    let port = url.port_or_known_default().unwrap_or(80);

    Ok((SocketAddr::new(ip, port), url.path().to_string()))
}

async fn read_request_head(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") || buf.len() >= MAX_REQUEST_HEAD {
            break;
        }
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn classify_request(request: &str, expected_path: &str) -> CallbackOutcome {
    // "GET /oauth2callback?code=... HTTP/1.1"
    let Some(target) = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
    else {
        return CallbackOutcome::Unrelated;
    };
    if !target.starts_with('/') {
        return CallbackOutcome::Unrelated;
    }
    let Ok(url) = Url::parse(&format!("http://localhost{target}")) else {
        return CallbackOutcome::Unrelated;
    };
    if url.path() != expected_path {
        return CallbackOutcome::Unrelated;
    }

    let mut code = None;
    let mut provider_error = None;
    for (key, value) in url.query_pairs() {
        match &*key {
            "code" if !value.is_empty() => code = Some(value.into_owned()),
            "error" => provider_error = Some(value.into_owned()),
            _ => {}
        }
    }
    match code {
        Some(code) => CallbackOutcome::Code(code),
        None => CallbackOutcome::Missing { provider_error },
    }
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        tracing::debug!("Failed to write callback response: {e}");
    }
    let _ = stream.shutdown().await;
}
