//! mxref-core: Shared types, traits, errors, and configuration for the mxref
//! manifest cross-reference index.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::*;
pub use traits::*;
pub use types::*;
