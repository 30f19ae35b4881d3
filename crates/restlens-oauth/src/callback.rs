//! One-shot loopback listener that captures the OAuth redirect.
//!
//! The listener is bound before the browser is opened so the OS-assigned
//! port can go into the redirect URI. It answers `GET /callback` with a small
//! HTML page and hands the query parameters to the waiting flow exactly once.
//! Every other path gets a 404 and leaves the flow waiting.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{OAuthError, Result};

/// Path the authorization server redirects to.
pub const CALLBACK_PATH: &str = "/callback";

const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// What the browser redirect carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackResult {
    /// The server issued a code (both fields are validated by the flow).
    Authorized {
        code: Option<String>,
        state: Option<String>,
    },
    /// The user or the server declined.
    Denied {
        error: String,
        description: Option<String>,
    },
}

#[derive(Debug, Default, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl From<CallbackParams> for CallbackResult {
    fn from(params: CallbackParams) -> Self {
        match params.error {
            Some(error) => CallbackResult::Denied {
                error,
                description: params.error_description,
            },
            None => CallbackResult::Authorized {
                code: params.code,
                state: params.state,
            },
        }
    }
}

type SharedSender = Arc<Mutex<Option<oneshot::Sender<CallbackResult>>>>;

/// Build the callback router. The first `/callback` hit is forwarded to
/// `sender`; later hits are answered but go nowhere.
pub fn router(sender: oneshot::Sender<CallbackResult>) -> Router {
    let shared: SharedSender = Arc::new(Mutex::new(Some(sender)));
    Router::new()
        .route(CALLBACK_PATH, get(handle_callback))
        .fallback(handle_not_found)
        .with_state(shared)
}

async fn handle_callback(
    State(sender): State<SharedSender>,
    Query(params): Query<CallbackParams>,
) -> Html<String> {
    let result = CallbackResult::from(params);
    let page = render_page(&result);

    match sender.lock().await.take() {
        Some(tx) => {
            tracing::debug!("Received OAuth callback");
            let _ = tx.send(result);
        }
        None => tracing::debug!("Ignoring repeated OAuth callback"),
    }

    Html(page)
}

async fn handle_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not found")
}

fn render_page(result: &CallbackResult) -> String {
    match result {
        CallbackResult::Authorized { code: Some(_), .. } => SUCCESS_PAGE.to_string(),
        CallbackResult::Authorized { code: None, .. } => {
            failure_page("No authorization code was received.")
        }
        CallbackResult::Denied { error, description } => {
            failure_page(description.as_deref().unwrap_or(error))
        }
    }
}

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>REST Lens</title></head>
<body style="font-family: system-ui; text-align: center; padding-top: 80px;">
<h2 style="color: #16a34a;">Authentication successful</h2>
<p>You can close this window and return to the terminal.</p>
</body>
</html>"#;

fn failure_page(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>REST Lens</title></head>
<body style="font-family: system-ui; text-align: center; padding-top: 80px;">
<h2 style="color: #dc2626;">Authentication failed</h2>
<p>{}</p>
<p>You can close this window and try again from the terminal.</p>
</body>
</html>"#,
        html_escape(message)
    )
}

fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// A bound loopback listener waiting for one redirect.
///
/// The redirect URI names `localhost`, so the listener binds `127.0.0.1` and,
/// when the host allows it, `[::1]` on the same port. Both serving tasks are
/// tied to one [`CancellationToken`]; it is cancelled by
/// [`CallbackServer::wait`] on every outcome and by `Drop` if the server is
/// abandoned, so the port never outlives the flow.
pub struct CallbackServer {
    addr: SocketAddr,
    ipv6_addr: Option<SocketAddr>,
    receiver: oneshot::Receiver<CallbackResult>,
    shutdown: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl CallbackServer {
    /// Bind `127.0.0.1` on an OS-assigned port and start serving.
    pub async fn bind() -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .map_err(|e| OAuthError::CallbackServer(format!("failed to bind loopback listener: {}", e)))?;
        let addr = listener
            .local_addr()
            .map_err(|e| OAuthError::CallbackServer(e.to_string()))?;

        let ipv6_listener = match TcpListener::bind(("::1", addr.port())).await {
            Ok(listener) => Some(listener),
            Err(e) => {
                tracing::debug!(port = addr.port(), error = %e, "IPv6 loopback unavailable");
                None
            }
        };
        let ipv6_addr = ipv6_listener
            .as_ref()
            .and_then(|listener| listener.local_addr().ok());

        let (tx, receiver) = oneshot::channel();
        let shutdown = CancellationToken::new();
        let app = router(tx);

        let mut handles = Vec::with_capacity(2);
        if let Some(listener) = ipv6_listener {
            handles.push(spawn_serve(listener, app.clone(), shutdown.clone()));
        }
        handles.push(spawn_serve(listener, app, shutdown.clone()));

        tracing::debug!(addr = %addr, ipv6 = ?ipv6_addr, "Callback listener bound");

        Ok(Self {
            addr,
            ipv6_addr,
            receiver,
            shutdown,
            handles,
        })
    }

    /// The bound IPv4 socket address.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// The `[::1]` address on the same port, if it could be bound.
    pub fn ipv6_addr(&self) -> Option<SocketAddr> {
        self.ipv6_addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// `http://localhost:<port>/callback`
    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}{}", self.port(), CALLBACK_PATH)
    }

    /// Wait for the redirect, then shut the listener down.
    ///
    /// With `timeout = None` this waits until a callback arrives.
    pub async fn wait(mut self, timeout: Option<Duration>) -> Result<CallbackResult> {
        let received = match timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut self.receiver).await {
                Ok(received) => received,
                Err(_) => {
                    self.close().await;
                    return Err(OAuthError::CallbackTimeout(limit.as_secs()));
                }
            },
            None => (&mut self.receiver).await,
        };

        self.close().await;
        received.map_err(|_| {
            OAuthError::CallbackServer("listener stopped before a callback arrived".to_string())
        })
    }

    /// Stop serving and wait briefly for the tasks to release the port.
    pub async fn close(&mut self) {
        self.shutdown.cancel();
        for handle in self.handles.drain(..) {
            let abort = handle.abort_handle();
            if tokio::time::timeout(SHUTDOWN_GRACE, handle).await.is_err() {
                tracing::debug!("Callback listener slow to stop, aborting");
                abort.abort();
            }
        }
        tracing::debug!(addr = %self.addr, "Callback listener closed");
    }
}

fn spawn_serve(listener: TcpListener, app: Router, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
        {
            tracing::warn!(error = %e, "Callback listener stopped with an error");
        }
    })
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn http() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    #[tokio::test]
    async fn test_other_paths_are_404_and_do_not_resolve() {
        let (tx, mut rx) = oneshot::channel();
        let app = router(tx);

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/favicon.ico").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(rx.try_recv().is_err());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/callback?code=abc&state=xyz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            rx.try_recv().unwrap(),
            CallbackResult::Authorized {
                code: Some("abc".to_string()),
                state: Some("xyz".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_error_callback_is_denied_and_escaped() {
        let (tx, mut rx) = oneshot::channel();
        let response = router(tx)
            .oneshot(
                Request::builder()
                    .uri("/callback?error=access_denied&error_description=%3Cscript%3Eno%3C%2Fscript%3E")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("Authentication failed"));
        assert!(body.contains("&lt;script&gt;no&lt;/script&gt;"));
        assert!(!body.contains("<script>"));

        assert_eq!(
            rx.try_recv().unwrap(),
            CallbackResult::Denied {
                error: "access_denied".to_string(),
                description: Some("<script>no</script>".to_string()),
            }
        );
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape(r#"a & b < "c" > 'd'"#), "a &amp; b &lt; &quot;c&quot; &gt; &#39;d&#39;");
    }

    #[tokio::test]
    async fn test_bound_server_resolves_once_and_releases_port() {
        let server = CallbackServer::bind().await.unwrap();
        let addr = server.local_addr();
        assert_eq!(
            server.redirect_uri(),
            format!("http://localhost:{}/callback", addr.port())
        );

        let waiter = tokio::spawn(server.wait(Some(Duration::from_secs(10))));

        let missing = http()
            .get(format!("http://{addr}/elsewhere"))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

        let page = http()
            .get(format!("http://{addr}/callback?code=c1&state=s1"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(page.contains("Authentication successful"));

        let result = waiter.await.unwrap().unwrap();
        assert_eq!(
            result,
            CallbackResult::Authorized {
                code: Some("c1".to_string()),
                state: Some("s1".to_string()),
            }
        );

        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_ipv6_loopback_reaches_callback_when_available() {
        let server = CallbackServer::bind().await.unwrap();
        let Some(addr6) = server.ipv6_addr() else {
            return;
        };
        assert_eq!(addr6.port(), server.port());

        let waiter = tokio::spawn(server.wait(Some(Duration::from_secs(10))));
        let page = http()
            .get(format!("http://{addr6}/callback?code=c6&state=s6"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(page.contains("Authentication successful"));

        let result = waiter.await.unwrap().unwrap();
        assert_eq!(
            result,
            CallbackResult::Authorized {
                code: Some("c6".to_string()),
                state: Some("s6".to_string()),
            }
        );
        assert!(tokio::net::TcpStream::connect(addr6).await.is_err());
    }

    #[tokio::test]
    async fn test_wait_times_out_and_releases_port() {
        let server = CallbackServer::bind().await.unwrap();
        let addr = server.local_addr();

        let err = server
            .wait(Some(Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert!(matches!(err, OAuthError::CallbackTimeout(_)));
        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }
}
