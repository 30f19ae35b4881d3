//! HTTP client for the REST Lens API.
//!
//! Typed access to projects and specifications, plus the completion wait
//! used after an upload.
//!
//! # Example
//!
//! ```no_run
//! use restlens_client::{NoProgress, RestLensClient, Result, WaitOptions, WaitOutcome};
//!
//! # async fn example(spec: serde_json::Value) -> Result<()> {
//! let client = RestLensClient::builder()
//!     .base_url("https://restlens.com")
//!     .auth_token("token")
//!     .build()?;
//!
//! let specs = client.specifications("acme", "petstore");
//! let uploaded = specs.upload(&spec, Some("v1")).await?;
//!
//! let outcome = specs
//!     .wait_for_completion(&uploaded.specification.id, &WaitOptions::default(), &NoProgress)
//!     .await?;
//! if outcome == WaitOutcome::Completed {
//!     let found = specs.violations(&uploaded.specification.id, &Default::default()).await?;
//!     println!("{} violations", found.total());
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod error;
pub mod types;
pub mod wait;

pub use api::{ProjectsApi, SpecificationsApi};
pub use client::{ClientBuilder, RestLensClient};
pub use error::{Error, Result};
pub use types::*;
pub use wait::{
    EventSource, HttpEventSource, LineSplitter, NoProgress, ProgressSink, Transport, WaitOptions,
    WaitOutcome, parse_event_line,
};
