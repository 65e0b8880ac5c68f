//! Database models and queries

pub mod init;
pub mod reviews;
pub mod submissions;

pub use init::*;
