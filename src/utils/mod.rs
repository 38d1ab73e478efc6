pub mod test_input;
pub use test_input::{TEST_INPUT_FILE, build_test_job, guess_mime, write_test_job};
pub mod url_validation;
pub use url_validation::{
    CallbackTarget, UrlValidationError, resolve_callback_target, validate_callback_url,
};
