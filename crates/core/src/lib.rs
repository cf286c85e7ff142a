//! Core types, validation, and short-code generation for shortlink.

pub mod domain;
pub mod error;
pub mod shortcode;
pub mod validation;

pub use domain::*;
pub use error::{Error, Result};
pub use shortcode::ShortCodeGenerator;
pub use validation::{UrlValidator, ValidationConfig};
