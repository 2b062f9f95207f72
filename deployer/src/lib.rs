pub mod broadcaster;
pub mod chains_config;
pub mod commands;
pub mod cosmos;
pub mod dec_coin;
mod error;
pub mod events;
pub mod msgs;
pub mod report;
pub mod settings;
pub mod wallet;

pub use error::Error;

pub const PREFIX: &str = "axelar";
