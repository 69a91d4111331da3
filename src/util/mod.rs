//! Utility functions for common operations.
//!
//! - **Text**: terminal width, truncation, wrapping and control-character
//!   stripping for server-provided strings
//! - **URLs**: validation before anything is handed to the system browser

mod text;
mod url_validator;

pub use text::{display_width, strip_control_chars, truncate_to_width, wrapped_rows};
pub use url_validator::{validate_url, validate_url_for_open, UrlValidationError};

/// Maximum allowed search query length, in characters.
pub const MAX_SEARCH_QUERY_LENGTH: usize = 256;
