pub mod config;
pub mod orchestrate;

pub use config::Config;
