pub mod job_error;

pub use job_error::{JobError, JobResult};
