//! Core definitions (error and result types), relied upon by all workcore-* crates.

pub mod error;
pub mod macros;
pub mod result;

pub use result::Result;
