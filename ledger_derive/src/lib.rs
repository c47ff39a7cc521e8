//! Derive macros for the ledger node crate.
//!
//! Provides:
//! - `#[derive(BinaryCodec)]` - canonical binary serialization used for hashing and the wire
//! - `#[derive(Error)]` - `Display` + `std::error::Error` from `#[error("...")]` attributes

mod binary_codec;
mod error;

use proc_macro::TokenStream;

/// Implements `Encode` and `Decode` from `crate::types::encoding` for a struct or enum.
#[proc_macro_derive(BinaryCodec)]
pub fn derive_binary_codec(input: TokenStream) -> TokenStream {
    binary_codec::derive_binary_codec(input)
}

/// Implements `Display` and `Error` for an error enum or struct.
#[proc_macro_derive(Error, attributes(error))]
pub fn derive_error(input: TokenStream) -> TokenStream {
    error::derive_error(input)
}
