//! Request and response types for the REST Lens API.
//!
//! These types mirror the server's JSON contract. Unknown fields are ignored
//! and most fields are optional so that older and newer servers both parse.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Projects
// ─────────────────────────────────────────────────────────────────────────────

/// A project visible to the authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Owning organization; personal projects have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_slug: Option<String>,
}

/// Response from `GET /api/projects`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectsResponse {
    #[serde(default)]
    pub projects: Vec<Project>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Specifications
// ─────────────────────────────────────────────────────────────────────────────

/// Body of a specification upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadRequest<'a> {
    pub spec: &'a serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<&'a str>,
}

/// Identifier and version of a stored specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecificationRef {
    pub id: String,
    pub version: u64,
}

/// Evaluation state reported with an upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationInfo {
    pub status: String,
}

/// Response from a specification upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResult {
    pub specification: SpecificationRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<EvaluationInfo>,
}

impl UploadResult {
    /// Whether the server started an evaluation that is still running.
    pub fn is_evaluating(&self) -> bool {
        self.evaluation
            .as_ref()
            .is_some_and(|e| e.status == EVALUATING)
    }
}

/// Status value the server reports while an evaluation runs.
pub const EVALUATING: &str = "evaluating";

/// One entry of the specification listing, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecificationSummary {
    pub id: String,
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// Response from `GET .../specifications`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecificationsResponse {
    #[serde(default)]
    pub specifications: Vec<SpecificationSummary>,
}

/// Evaluation status of a single specification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecificationStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(default, alias = "status", skip_serializing_if = "Option::is_none")]
    pub evaluation_status: Option<String>,
}

impl SpecificationStatus {
    /// Still running, or not reporting a status yet.
    pub fn is_pending(&self) -> bool {
        self.evaluation_status
            .as_deref()
            .is_none_or(|status| status == EVALUATING)
    }
}

/// The status endpoint answers either bare or wrapped in `specification`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum StatusEnvelope {
    Wrapped { specification: SpecificationStatus },
    Bare(SpecificationStatus),
}

impl From<StatusEnvelope> for SpecificationStatus {
    fn from(envelope: StatusEnvelope) -> Self {
        match envelope {
            StatusEnvelope::Wrapped { specification } => specification,
            StatusEnvelope::Bare(status) => status,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Violations
// ─────────────────────────────────────────────────────────────────────────────

/// Where in the document a group of violations applies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViolationKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_path: Option<String>,
}

impl ViolationKey {
    /// `path`, then `schema_path`, then `(global)`.
    pub fn location(&self) -> &str {
        self.path
            .as_deref()
            .filter(|p| !p.is_empty())
            .or(self.schema_path.as_deref().filter(|p| !p.is_empty()))
            .unwrap_or("(global)")
    }
}

/// A single rule violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub message: String,
    pub severity: String,
    pub rule_id: u64,
}

/// Violations sharing a location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationGroup {
    pub key: ViolationKey,
    #[serde(default)]
    pub value: Vec<Violation>,
}

/// Response from `GET .../violations`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationsResponse {
    #[serde(default)]
    pub violations: Vec<ViolationGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_violations: Option<u64>,
}

impl ViolationsResponse {
    /// Number of violations actually returned.
    pub fn returned_count(&self) -> u64 {
        self.violations.iter().map(|g| g.value.len() as u64).sum()
    }

    /// Server-reported total, falling back to the returned count.
    pub fn total(&self) -> u64 {
        self.total_violations.unwrap_or_else(|| self.returned_count())
    }
}

/// Query parameters for the violations listing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ViolationsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Evaluation stream
// ─────────────────────────────────────────────────────────────────────────────

/// Payload of one `data:` line on the evaluation stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationEvent {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl EvaluationEvent {
    /// `done` and `failed` both end the wait.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status.as_deref(), Some("done") | Some("failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_location_order() {
        let key = ViolationKey {
            path: Some("/pets".to_string()),
            operation_id: None,
            schema_path: Some("#/components/schemas/Pet".to_string()),
        };
        assert_eq!(key.location(), "/pets");

        let key = ViolationKey {
            path: None,
            operation_id: Some("listPets".to_string()),
            schema_path: Some("#/components/schemas/Pet".to_string()),
        };
        assert_eq!(key.location(), "#/components/schemas/Pet");

        assert_eq!(ViolationKey::default().location(), "(global)");
    }

    #[test]
    fn test_violations_total_falls_back_to_count() {
        let response: ViolationsResponse = serde_json::from_value(serde_json::json!({
            "violations": [
                {"key": {"path": "/a"}, "value": [
                    {"message": "m1", "severity": "error", "rule_id": 1},
                    {"message": "m2", "severity": "warning", "rule_id": 2}
                ]},
                {"key": {}, "value": [
                    {"message": "m3", "severity": "info", "rule_id": 3}
                ]}
            ]
        }))
        .unwrap();
        assert_eq!(response.total(), 3);

        let limited = ViolationsResponse {
            total_violations: Some(120),
            ..response
        };
        assert_eq!(limited.total(), 120);
        assert_eq!(limited.returned_count(), 3);
    }

    #[test]
    fn test_terminal_events() {
        let parse = |json: &str| serde_json::from_str::<EvaluationEvent>(json).unwrap();
        assert!(parse(r#"{"type":"status","status":"done"}"#).is_terminal());
        assert!(parse(r#"{"status":"done"}"#).is_terminal());
        assert!(parse(r#"{"status":"failed"}"#).is_terminal());
        assert!(!parse(r#"{"type":"status","status":"evaluating"}"#).is_terminal());
        assert!(!parse(r#"{"type":"progress","rule":4}"#).is_terminal());
    }

    #[test]
    fn test_status_envelope_shapes() {
        let wrapped: StatusEnvelope = serde_json::from_str(
            r#"{"specification":{"id":"s1","version":2,"evaluationStatus":"completed"}}"#,
        )
        .unwrap();
        let status = SpecificationStatus::from(wrapped);
        assert_eq!(status.evaluation_status.as_deref(), Some("completed"));
        assert!(!status.is_pending());

        let bare: StatusEnvelope = serde_json::from_str(r#"{"status":"evaluating"}"#).unwrap();
        assert!(SpecificationStatus::from(bare).is_pending());

        let empty: StatusEnvelope = serde_json::from_str("{}").unwrap();
        assert!(SpecificationStatus::from(empty).is_pending());
    }

    #[test]
    fn test_upload_result_evaluating() {
        let result: UploadResult = serde_json::from_str(
            r#"{"specification":{"id":"abc","version":3},"evaluation":{"status":"evaluating"}}"#,
        )
        .unwrap();
        assert!(result.is_evaluating());

        let result: UploadResult =
            serde_json::from_str(r#"{"specification":{"id":"abc","version":3}}"#).unwrap();
        assert!(!result.is_evaluating());
    }
}
