//! Test Fixtures Module
//!
//! - Audio fixtures (programmatically generated WAV data)
//! - Worker configuration and mock analysis service helpers

// Not every test binary uses every fixture
#![allow(dead_code)]

pub mod audio_fixtures;
pub mod worker_fixtures;

pub use audio_fixtures::*;
pub use worker_fixtures::*;
