#![forbid(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/", "README.md"))]

pub mod delegated;
pub mod engine;
pub mod errors;
pub mod events;
pub mod handler;
pub mod selection;
pub mod service;

pub use errors::{CustomResult, ThreeDs2Error};
pub use handler::ThreeDs2ActionHandler;
