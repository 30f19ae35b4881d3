//! Main client implementation.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use url::Url;

use crate::api::{ProjectsApi, SpecificationsApi};
use crate::error::{Error, ErrorResponse, Result};

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// REST Lens API client.
///
/// # Example
///
/// ```no_run
/// use restlens_client::RestLensClient;
///
/// # async fn example() -> restlens_client::Result<()> {
/// let client = RestLensClient::builder()
///     .base_url("https://restlens.com")
///     .auth_token("token")
///     .build()?;
///
/// let projects = client.projects().list(None).await?;
/// println!("{} projects", projects.projects.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RestLensClient {
    inner: Arc<ClientInner>,
}

/// Inner client state (shared across clones).
pub(crate) struct ClientInner {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: Url,
    pub(crate) timeout: Duration,
}

impl RestLensClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Access the projects API.
    pub fn projects(&self) -> ProjectsApi {
        ProjectsApi::new(self.clone())
    }

    /// Access the specifications of one project.
    pub fn specifications(&self, org: &str, project: &str) -> SpecificationsApi {
        SpecificationsApi::new(self.clone(), org, project)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal HTTP methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Build a URL for an API path.
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        let path = path.trim_start_matches('/');
        self.inner
            .base_url
            .join(&format!("api/{}", path))
            .map_err(Error::from)
    }

    /// Make a GET request.
    pub(crate) async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path)?;
        tracing::debug!(url = %url, "GET");
        let response = self
            .inner
            .http
            .get(url)
            .timeout(self.inner.timeout)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Make a GET request with query parameters.
    pub(crate) async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        Q: serde::Serialize + ?Sized,
    {
        let url = self.url(path)?;
        tracing::debug!(url = %url, "GET");
        let response = self
            .inner
            .http
            .get(url)
            .query(query)
            .timeout(self.inner.timeout)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Make a POST request and return the raw response, whatever its status.
    pub(crate) async fn post_raw<B>(&self, path: &str, body: &B) -> Result<reqwest::Response>
    where
        B: serde::Serialize + ?Sized,
    {
        let url = self.url(path)?;
        tracing::debug!(url = %url, "POST");
        Ok(self
            .inner
            .http
            .post(url)
            .json(body)
            .timeout(self.inner.timeout)
            .send()
            .await?)
    }

    /// Open a long-lived GET. No request timeout applies; callers bound the
    /// wait themselves.
    pub(crate) async fn get_stream(&self, path: &str) -> Result<reqwest::Response> {
        let url = self.url(path)?;
        tracing::debug!(url = %url, "GET (stream)");
        let response = self.inner.http.get(url).send().await?;

        if !response.status().is_success() {
            return Err(Self::extract_error(response).await);
        }

        Ok(response)
    }

    /// Handle a response, extracting the body or error.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::extract_error(response).await)
        }
    }

    /// Extract an error from a failed response.
    pub(crate) async fn extract_error(response: reqwest::Response) -> Error {
        let status = response.status();
        let message = Self::error_message(response).await;

        match status.as_u16() {
            401 => Error::Auth(message),
            404 => Error::NotFound(message),
            code => Error::Api {
                status: code,
                message,
            },
        }
    }

    /// The server's `error`/`message` field, or the status text.
    pub(crate) async fn error_message(response: reqwest::Response) -> String {
        let status = response.status();
        response
            .json::<ErrorResponse>()
            .await
            .ok()
            .and_then(ErrorResponse::into_message)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
            })
    }
}

/// Builder for creating a [`RestLensClient`].
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: Option<String>,
    auth_token: Option<String>,
    timeout: Duration,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: None,
            auth_token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the base URL for the server.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the bearer token.
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<RestLensClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Config("base_url is required".to_string()))?;

        let mut base_url = Url::parse(&base_url)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let mut headers = HeaderMap::new();
        if let Some(token) = &self.auth_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| Error::Config("Invalid auth token".to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("restlens-cli/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(RestLensClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                timeout: self.timeout,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
