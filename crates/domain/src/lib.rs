//! Domain layer for the talk speech pipeline
//!
//! Contains the data model shared by the synthesis pipeline and its callers:
//! talks, their audio, emotions and session identifiers.
//! This layer performs no I/O.

pub mod entities;
pub mod value_objects;

pub use entities::*;
pub use value_objects::*;
