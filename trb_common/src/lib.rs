mod tokens;

pub mod op;
mod secret;

pub use secret::Secret;
pub use tokens::{Tokens, TokensConversionError};
