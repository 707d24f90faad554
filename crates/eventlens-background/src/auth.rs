//! Interactive authorization prompt.
//!
//! The browser extension gets the consent page from its host; outside the
//! browser, [`LoopbackPrompt`] opens the system browser and catches Google's
//! redirect on a local listener.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Mutex, PoisonError, mpsc};
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use eventlens_core::CalendarMap;
use eventlens_google::OAuthClient;

use crate::error::{BackgroundError, BackgroundResult};
use crate::relay::BoxFuture;
use crate::session::Session;

/// Path of the redirect URI on the loopback listener.
pub const CALLBACK_PATH: &str = "/provider_cb";

/// Default wait for the OAuth callback.
pub const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// How long one connection may take to send its request head. Browsers open
/// speculative connections that never send anything.
const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Shows Google's consent page and returns the URL it redirected to.
pub trait AuthPrompt: Send + Sync {
    /// The redirect URI registered for this prompt.
    fn redirect_uri(&self) -> String;

    /// Opens `auth_url` and resolves to the full redirect URL.
    fn launch<'a>(&'a self, auth_url: &'a str) -> BoxFuture<'a, BackgroundResult<String>>;
}

/// Runs the authorization flow through `prompt`, then fills the calendar map.
///
/// Nothing is retried: a dismissed prompt, a denied consent or a failed
/// exchange ends the flow with an error.
pub async fn authorize(
    session: &Session,
    prompt: &dyn AuthPrompt,
) -> BackgroundResult<CalendarMap> {
    let redirect_uri = prompt.redirect_uri();
    let auth_url = session.oauth().authorization_url(&redirect_uri);

    let redirect_url = prompt.launch(&auth_url).await?;
    let code = OAuthClient::code_from_redirect(&redirect_url)?;
    info!("received authorization code, exchanging for tokens");

    session.exchange_code(&code, &redirect_uri).await?;
    session.refresh_calendars().await
}

/// Prompt that opens the system browser and listens on `127.0.0.1`.
///
/// Serves a single authorization; a second `launch` fails.
#[derive(Debug)]
pub struct LoopbackPrompt {
    port: u16,
    listener: Mutex<Option<TcpListener>>,
    timeout: Duration,
}

impl LoopbackPrompt {
    /// Binds the first free port of `port_range`.
    pub fn bind(port_range: (u16, u16)) -> BackgroundResult<Self> {
        for port in port_range.0..=port_range.1 {
            match TcpListener::bind(("127.0.0.1", port)) {
                Ok(listener) => {
                    let port = listener.local_addr()?.port();
                    debug!("bound loopback listener on port {}", port);
                    return Ok(Self {
                        port,
                        listener: Mutex::new(Some(listener)),
                        timeout: CALLBACK_TIMEOUT,
                    });
                }
                Err(e) => debug!("port {} unavailable: {}", port, e),
            }
        }
        Err(BackgroundError::config(format!(
            "no available port in range {}-{}",
            port_range.0, port_range.1
        )))
    }

    /// Sets how long to wait for the redirect.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the bound port.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Waits for the redirect and returns its full URL.
    fn wait_for_callback(
        listener: TcpListener,
        port: u16,
        timeout: Duration,
    ) -> BackgroundResult<String> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            for stream in listener.incoming() {
                match stream {
                    Ok(stream) => {
                        if let Some(path) = Self::handle_callback(stream) {
                            let _ = tx.send(path);
                            return;
                        }
                    }
                    Err(e) => error!("failed to accept connection: {}", e),
                }
            }
        });

        match rx.recv_timeout(timeout) {
            Ok(path) => Ok(format!("http://127.0.0.1:{}{}", port, path)),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                Err(BackgroundError::auth_prompt("OAuth callback timeout"))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(BackgroundError::auth_prompt("callback listener stopped"))
            }
        }
    }

    /// Answers one HTTP request; returns its path if it is the redirect.
    ///
    /// A redirect without a usable code (denied consent) gets a 400 page but
    /// its path is still returned, so the flow can report why.
    fn handle_callback(mut stream: TcpStream) -> Option<String> {
        if let Err(e) = stream.set_read_timeout(Some(REQUEST_READ_TIMEOUT)) {
            warn!("failed to set read timeout on callback connection: {}", e);
        }
        let mut reader = BufReader::new(&stream);
        let mut request_line = String::new();
        reader.read_line(&mut request_line).ok()?;

        // GET /provider_cb?code=... HTTP/1.1
        let mut parts = request_line.split_whitespace();
        if parts.next() != Some("GET") {
            return None;
        }
        let path = parts.next()?.to_string();

        // Drain the headers so closing the socket does not reset the connection.
        let mut line = String::new();
        while reader.read_line(&mut line).is_ok_and(|n| n > 2) {
            line.clear();
        }

        if !path.starts_with(CALLBACK_PATH) {
            let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");
            return None;
        }

        let response = if OAuthClient::code_from_redirect(&format!("http://127.0.0.1{}", path))
            .is_ok()
        {
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n\
            <html><body><h1>eventlens is authorized</h1>\
            <p>You can close this window.</p></body></html>"
        } else {
            "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\n\r\n\
            <html><body><h1>eventlens was not authorized</h1>\
            <p>You can close this window.</p></body></html>"
        };
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.flush();

        Some(path)
    }
}

impl AuthPrompt for LoopbackPrompt {
    fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}{}", self.port, CALLBACK_PATH)
    }

    fn launch<'a>(&'a self, auth_url: &'a str) -> BoxFuture<'a, BackgroundResult<String>> {
        Box::pin(async move {
            let listener = self
                .listener
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
                .ok_or_else(|| BackgroundError::auth_prompt("loopback prompt already used"))?;

            info!("opening browser for Google authorization");
            debug!("authorization URL: {}", auth_url);
            if let Err(e) = open::that(auth_url) {
                warn!("failed to open browser: {}", e);
                eprintln!("\nPlease open this URL in your browser:\n\n{}\n", auth_url);
            }

            let (port, timeout) = (self.port, self.timeout);
            tokio::task::spawn_blocking(move || Self::wait_for_callback(listener, port, timeout))
                .await
                .map_err(|e| {
                    BackgroundError::auth_prompt(format!("callback task failed: {}", e))
                })?
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn get(port: u16, path: &str) -> String {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        write!(stream, "GET {} HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n", path).unwrap();
        let mut response = String::new();
        let _ = stream.read_to_string(&mut response);
        response
    }

    #[test]
    fn bind_picks_a_port_in_range() {
        let first = LoopbackPrompt::bind((0, 0)).unwrap();
        assert_ne!(first.port(), 0);
        assert_eq!(
            first.redirect_uri(),
            format!("http://127.0.0.1:{}/provider_cb", first.port())
        );
    }

    #[test]
    fn bind_fails_when_range_is_taken() {
        let taken = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let port = taken.local_addr().unwrap().port();
        assert!(LoopbackPrompt::bind((port, port)).is_err());
    }

    #[test]
    fn callback_returns_redirect_url() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let port = listener.local_addr().unwrap().port();

        let client = thread::spawn(move || {
            let favicon = get(port, "/favicon.ico");
            assert!(favicon.starts_with("HTTP/1.1 404"));
            get(port, "/provider_cb?code=4%2Fabc&scope=calendar")
        });

        let url =
            LoopbackPrompt::wait_for_callback(listener, port, Duration::from_secs(10)).unwrap();
        assert_eq!(
            url,
            format!("http://127.0.0.1:{}/provider_cb?code=4%2Fabc&scope=calendar", port)
        );
        assert!(client.join().unwrap().starts_with("HTTP/1.1 200 OK"));
    }

    #[test]
    fn idle_connection_does_not_block_the_redirect() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let port = listener.local_addr().unwrap().port();

        let client = thread::spawn(move || {
            let idle = TcpStream::connect(("127.0.0.1", port)).unwrap();
            let response = get(port, "/provider_cb?code=4%2Fabc");
            drop(idle);
            response
        });

        let url =
            LoopbackPrompt::wait_for_callback(listener, port, Duration::from_secs(30)).unwrap();
        assert!(url.ends_with("/provider_cb?code=4%2Fabc"));
        assert!(client.join().unwrap().starts_with("HTTP/1.1 200 OK"));
    }

    #[test]
    fn denied_consent_gets_bad_request_page() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let port = listener.local_addr().unwrap().port();

        let client = thread::spawn(move || get(port, "/provider_cb?error=access_denied"));

        let url =
            LoopbackPrompt::wait_for_callback(listener, port, Duration::from_secs(10)).unwrap();
        assert!(OAuthClient::code_from_redirect(&url).is_err());
        assert!(client.join().unwrap().starts_with("HTTP/1.1 400 Bad Request"));
    }

    #[test]
    fn callback_times_out() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        let err = LoopbackPrompt::wait_for_callback(listener, port, Duration::from_millis(50))
            .unwrap_err();
        assert!(matches!(err, BackgroundError::AuthPrompt { .. }));
    }
}
