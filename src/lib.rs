pub mod act;
pub mod apply;
pub mod cli;
pub mod config;
pub mod errors;
pub mod extract;
pub mod log;
pub mod pipeline;
pub mod plan;
pub mod prompt;
pub mod provider;
pub mod safety;
pub mod session;
pub mod ux;
pub mod wire;

pub use errors::{Result, WebgenError};
