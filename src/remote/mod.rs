//! Remote workflow layer
//!
//! - GenerationSource: trait the registry consumes
//! - WorkflowClient: reqwest implementation against the hosted workflow API
//! - MockSource: scripted implementation for tests

pub mod client;
pub mod mock;
pub mod source;

pub use client::{DEFAULT_BASE_URL, DEFAULT_VERSION, WorkflowClient, WorkflowConfig};
pub use mock::{MockBehavior, MockSource};
pub use source::GenerationSource;
