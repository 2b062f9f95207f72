use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to load settings, falling back on default")]
    LoadSettings,
    #[error("failed to load chains config")]
    LoadChainsConfig,
    #[error("failed to save chains config")]
    SaveChainsConfig,
    #[error("chains config is missing required data")]
    InvalidChainsConfig,
    #[error("invalid input")]
    InvalidInput,
    #[error("no mnemonic provided, set --mnemonic or MNEMONIC")]
    MissingMnemonic,
    #[error("failed to load wallet")]
    Wallet,
    #[error("connection failed")]
    Connection,
    #[error("broadcaster failed")]
    Broadcaster,
    #[error("query failed")]
    Query,
    #[error("failed to read contract artifact")]
    Artifact,
    #[error("tx result is missing expected event data")]
    MissingEventData,
    #[error("chain codec migration failed")]
    ChainCodecMigration,
    #[error("load test failed")]
    LoadTest,
    #[error("failed to write load test output")]
    Output,
}
