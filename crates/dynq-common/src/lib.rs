//! Shared vocabulary of the dynq expression compiler: spans, tokens and the
//! single error type every stage reports through.

pub mod error;
pub mod span;
pub mod token;

pub use error::{ErrorCategory, ErrorKind, ParseError};
pub use span::Span;
pub use token::{Token, TokenKind};
