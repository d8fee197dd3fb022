//! CLI command implementations

pub mod config;
pub mod pack;
pub mod seed;
pub mod status;
pub mod unpack;
pub mod watch;
