//! Shared byte-level helpers. Every width is checked and every failure is an `EncodingError`.

pub mod bytes;
pub mod crypto;
