//! Projects API.

use serde::Serialize;

use crate::client::RestLensClient;
use crate::error::Result;
use crate::types::ProjectsResponse;

#[derive(Serialize)]
struct ProjectsQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    organization: Option<&'a str>,
}

/// Projects API client.
pub struct ProjectsApi {
    client: RestLensClient,
}

impl ProjectsApi {
    pub(crate) fn new(client: RestLensClient) -> Self {
        Self { client }
    }

    /// List projects, optionally restricted to one organization.
    pub async fn list(&self, organization: Option<&str>) -> Result<ProjectsResponse> {
        self.client
            .get_with_query("projects", &ProjectsQuery { organization })
            .await
    }
}
