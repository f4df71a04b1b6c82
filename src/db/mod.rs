use thiserror::Error;

pub mod contract_store;

pub use contract_store::ContractStore;

/// Failures of the contract store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),

    #[error("Contracts file cannot be read: {0}")]
    Unavailable(#[source] std::io::Error),

    #[error("Contracts file is not valid JSON: {0}")]
    Corrupt(#[source] serde_json::Error),

    #[error("Contracts could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Contracts file cannot be written: {0}")]
    Write(#[source] std::io::Error),
}
