pub mod brk;
pub mod common;
pub mod config;
pub mod sessions;
pub mod stats;
pub mod timer;
pub mod watch;
