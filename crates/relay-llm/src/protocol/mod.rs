//! Wire format types for the backend HTTP APIs
//!
//! Each module holds plain serde structs matching one backend's JSON format.
//! They exist only at the serialization boundary; everything else works on
//! the canonical types in [`crate::types`].

pub mod anthropic;
pub mod chat;
pub mod responses;
