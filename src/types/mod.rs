//! Primitive types shared across the crate.

pub mod address;
pub mod bytes;
pub mod encoding;
pub mod hash;
pub mod merkle_tree;
