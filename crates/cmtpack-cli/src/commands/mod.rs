//! CLI command implementations

pub mod convert;
pub mod init;
pub mod tables;
pub mod validate;
