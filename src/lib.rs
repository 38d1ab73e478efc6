pub mod config;
pub mod core;
pub mod errors;
pub mod handlers;
pub mod init;
pub mod routes;
pub mod state;
pub mod utils;

// Re-export commonly used items for convenience
pub use config::WorkerConfig;
pub use crate::core::{Job, JobInput};
pub use errors::{JobError, JobResult};
pub use handlers::{JobHandler, JobResponse};
pub use state::AppState;
