//! Specifications API.

use tokio::time::Instant;

use crate::client::RestLensClient;
use crate::error::{Error, Result};
use crate::types::{
    SpecificationStatus, SpecificationsResponse, StatusEnvelope, UploadRequest, UploadResult,
    ViolationsQuery, ViolationsResponse,
};
use crate::wait::{
    HttpEventSource, ProgressSink, StatusSource, StreamStep, Transport, WaitOptions, WaitOutcome,
    poll_until_done, wait_on_source,
};

/// Specifications of one project.
pub struct SpecificationsApi {
    client: RestLensClient,
    base_path: String,
}

impl SpecificationsApi {
    pub(crate) fn new(client: RestLensClient, org: &str, project: &str) -> Self {
        let base_path = format!(
            "projects/{}/{}/specifications",
            urlencoding::encode(org),
            urlencoding::encode(project)
        );
        Self { client, base_path }
    }

    fn path(&self, spec_id: &str) -> String {
        format!("{}/{}", self.base_path, urlencoding::encode(spec_id))
    }

    /// Upload a parsed specification document.
    pub async fn upload(&self, spec: &serde_json::Value, tag: Option<&str>) -> Result<UploadResult> {
        let response = self
            .client
            .post_raw(&self.base_path, &UploadRequest { spec, tag })
            .await?;

        if !response.status().is_success() {
            return Err(Error::UploadFailed(
                RestLensClient::error_message(response).await,
            ));
        }

        Ok(response.json().await?)
    }

    /// List specifications, newest first.
    pub async fn list(&self) -> Result<SpecificationsResponse> {
        self.client.get(&self.base_path).await
    }

    /// Current evaluation status of one specification.
    pub async fn status(&self, spec_id: &str) -> Result<SpecificationStatus> {
        let envelope: StatusEnvelope = self.client.get(&self.path(spec_id)).await?;
        Ok(envelope.into())
    }

    /// Violations found for one specification.
    pub async fn violations(
        &self,
        spec_id: &str,
        query: &ViolationsQuery,
    ) -> Result<ViolationsResponse> {
        self.client
            .get_with_query(&format!("{}/violations", self.path(spec_id)), query)
            .await
    }

    /// Open the evaluation event stream.
    pub async fn open_stream(&self, spec_id: &str) -> Result<HttpEventSource> {
        let response = self
            .client
            .get_stream(&format!("{}/stream", self.path(spec_id)))
            .await?;
        Ok(HttpEventSource::new(response))
    }

    /// Block until the evaluation reaches a terminal state or the timeout
    /// elapses.
    ///
    /// The stream transport falls back to polling for the rest of the time
    /// budget when the stream cannot be opened or breaks. A status request
    /// that fails during that fallback ends the wait as
    /// [`WaitOutcome::TimedOut`]; with [`Transport::Poll`] it is returned as
    /// an error.
    pub async fn wait_for_completion(
        &self,
        spec_id: &str,
        options: &WaitOptions,
        progress: &dyn ProgressSink,
    ) -> Result<WaitOutcome> {
        let deadline = Instant::now() + options.timeout;

        if options.transport == Transport::Stream {
            match tokio::time::timeout_at(deadline, self.open_stream(spec_id)).await {
                Err(_) => return Ok(WaitOutcome::TimedOut),
                Ok(Ok(mut source)) => {
                    match wait_on_source(&mut source, deadline, options.tick_interval, progress).await
                    {
                        StreamStep::Completed => return Ok(WaitOutcome::Completed),
                        StreamStep::TimedOut => return Ok(WaitOutcome::TimedOut),
                        StreamStep::Broken(e) => {
                            tracing::warn!(error = %e, "Evaluation stream broke, polling instead");
                        }
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Could not open evaluation stream, polling instead");
                }
            }
        }

        let source = SpecStatusSource { api: self, spec_id };
        let polled = poll_until_done(&source, deadline, options.poll_interval, progress).await;

        match polled {
            Err(e) if options.transport == Transport::Stream => {
                tracing::warn!(error = %e, "Status polling failed, giving up on the wait");
                Ok(WaitOutcome::TimedOut)
            }
            other => other,
        }
    }
}

struct SpecStatusSource<'a> {
    api: &'a SpecificationsApi,
    spec_id: &'a str,
}

#[async_trait::async_trait]
impl<'a> StatusSource for SpecStatusSource<'a> {
    async fn fetch_status(&self) -> Result<SpecificationStatus> {
        self.api.status(self.spec_id).await
    }
}
