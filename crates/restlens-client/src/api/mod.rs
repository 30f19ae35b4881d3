//! API endpoint implementations.

mod projects;
mod specifications;

pub use projects::ProjectsApi;
pub use specifications::SpecificationsApi;
