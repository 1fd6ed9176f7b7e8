//! Core value and identifier types shared across the dump pipeline.

pub mod identifier;
pub mod value;

pub use identifier::quote_ident;
pub use value::ScalarValue;
