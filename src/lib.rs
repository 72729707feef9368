//! cvagent - asynchronous CV extraction tasks over a hosted generative workflow
//!
//! A task submits a CV and a report to the remote workflow, demultiplexes the
//! streamed event log down to one labeled channel, and parses that channel's
//! text as JSON. Callers poll the task registry for the result.

pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod id;
pub mod registry;
pub mod remote;
pub mod server;
pub mod stream;

pub use error::{CvAgentError, Result};
