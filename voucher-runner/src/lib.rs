pub mod client;
pub mod config;
pub mod extract;
pub mod handle;
pub mod jobs;
pub mod output;
