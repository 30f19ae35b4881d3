//! Loading specification documents and parsing project references.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecFileError {
    #[error("Error reading file: {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid specification format. Must be valid JSON or YAML.")]
    MalformedSpec,

    #[error("Project must be in org/name format (e.g., my-org/my-project), got '{0}'")]
    InvalidProject(String),
}

/// A project reference of the form `org/name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRef {
    pub org: String,
    pub name: String,
}

impl std::fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.org, self.name)
    }
}

/// Parse `org/name`; both parts must be non-empty and there must be exactly two.
pub fn parse_project(project: &str) -> Result<ProjectRef, SpecFileError> {
    let mut parts = project.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(org), Some(name), None) if !org.is_empty() && !name.is_empty() => Ok(ProjectRef {
            org: org.to_string(),
            name: name.to_string(),
        }),
        _ => Err(SpecFileError::InvalidProject(project.to_string())),
    }
}

/// Read a specification file relative to the working directory and parse it
/// as JSON, falling back to YAML.
pub fn read_and_parse_spec(file: &Path) -> Result<serde_json::Value, SpecFileError> {
    let path = std::env::current_dir()
        .map(|cwd| cwd.join(file))
        .unwrap_or_else(|_| file.to_path_buf());

    let content = std::fs::read_to_string(&path).map_err(|source| SpecFileError::Read {
        path: path.clone(),
        source,
    })?;

    parse_spec(&content)
}

/// Parse document text as JSON, then YAML.
pub fn parse_spec(content: &str) -> Result<serde_json::Value, SpecFileError> {
    if let Ok(value) = serde_json::from_str(content) {
        return Ok(value);
    }

    match serde_yaml::from_str::<serde_json::Value>(content) {
        Ok(value) if value.is_object() => Ok(value),
        Ok(_) => Err(SpecFileError::MalformedSpec),
        Err(e) => {
            tracing::debug!(error = %e, "Specification is neither JSON nor YAML");
            Err(SpecFileError::MalformedSpec)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_project() {
        assert_eq!(
            parse_project("acme/petstore").unwrap(),
            ProjectRef {
                org: "acme".to_string(),
                name: "petstore".to_string(),
            }
        );
        assert_eq!(parse_project("acme/petstore").unwrap().to_string(), "acme/petstore");

        for bad in ["acme", "acme/", "/petstore", "", "a/b/c"] {
            assert!(
                matches!(parse_project(bad), Err(SpecFileError::InvalidProject(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_json_spec() {
        let value = parse_spec(r#"{"openapi": "3.0.0", "paths": {}}"#).unwrap();
        assert_eq!(value["openapi"], "3.0.0");
    }

    #[test]
    fn test_parse_yaml_spec() {
        let value = parse_spec("openapi: 3.1.0\ninfo:\n  title: Pets\n  version: '1'\n").unwrap();
        assert_eq!(value["openapi"], "3.1.0");
        assert_eq!(value["info"]["title"], "Pets");
    }

    #[test]
    fn test_malformed_spec() {
        assert!(matches!(
            parse_spec("openapi: [unclosed"),
            Err(SpecFileError::MalformedSpec)
        ));
        assert!(matches!(
            parse_spec("just some words"),
            Err(SpecFileError::MalformedSpec)
        ));
    }

    #[test]
    fn test_read_missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        let err = read_and_parse_spec(&missing).unwrap_err();
        assert!(matches!(err, SpecFileError::Read { .. }));
        assert!(err.to_string().contains("nope.yaml"));
    }

    #[test]
    fn test_read_file_from_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("spec.json");
        std::fs::write(&file, r#"{"openapi":"3.0.3"}"#).unwrap();
        assert_eq!(read_and_parse_spec(&file).unwrap()["openapi"], "3.0.3");
    }
}
