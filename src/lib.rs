pub mod config;
pub mod core;
pub mod launchers;
pub mod utils;
