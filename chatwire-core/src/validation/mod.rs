//! Request validation
//!
//! Parsing only proves a payload has the right shape. The validator enforces
//! the value constraints the protocol documents on top of that shape:
//! non-empty conversations, sampling parameter ranges and well-formed tools.

mod error;
mod request;

pub use error::{ValidationError, ValidationErrorKind};
pub use request::{
    check_frequency_penalty, check_max_tokens, check_presence_penalty, check_temperature,
    check_top_p, RequestLimits, RequestValidator,
};
