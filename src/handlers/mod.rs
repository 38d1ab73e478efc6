//! Job and HTTP request handlers
//!
//! - `api` - Health check and synchronous job endpoints
//! - `job` - Job orchestration shared by every entry point

pub mod api;
pub mod job;

pub use job::{JobHandler, JobResponse, run_job};
