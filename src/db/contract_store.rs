use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use tokio::sync::Mutex;

use crate::{
    db::StoreError,
    models::contract::{Contract, ContractInput, MISSING_NAME},
};

/// Contract store backed by a single JSON file holding the whole collection.
///
/// Every mutation is a read-modify-write of the full file. The `write_lock`
/// serializes those cycles so concurrent upserts cannot clobber each other,
/// and writes land through a temporary file plus rename so a reader never
/// sees a partially written collection.
pub struct ContractStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ContractStore {
    /// Create a new ContractStore for the given file. The file is not
    /// touched until the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get all contracts. A missing file is an empty collection.
    pub async fn list(&self) -> Result<Vec<Contract>, StoreError> {
        self.load().await
    }

    /// Get a contract by ID
    pub async fn find(&self, id: &str) -> Result<Option<Contract>, StoreError> {
        let contracts = self.load().await?;
        Ok(contracts.into_iter().find(|c| c.id == id))
    }

    /// Create or replace a contract by ID
    pub async fn upsert(&self, input: ContractInput) -> Result<Contract, StoreError> {
        if input.resolved_name().trim().is_empty() {
            return Err(StoreError::Validation(MISSING_NAME.to_string()));
        }

        let _guard = self.write_lock.lock().await;
        let mut contracts = self.load().await?;

        let now = Utc::now();
        let id = input
            .supplied_id()
            .unwrap_or_else(|| generate_id(&contracts, now.timestamp_millis()));
        let previous = contracts.iter().find(|c| c.id == id);
        let contract = input
            .into_contract(id, now, previous)
            .map_err(StoreError::Validation)?;

        contracts.retain(|c| c.id != contract.id);
        contracts.push(contract.clone());
        self.persist(&contracts).await?;

        tracing::info!("Saved contract {} ({})", contract.id, contract.name);
        Ok(contract)
    }

    /// Delete a contract by ID. Deleting an unknown ID is not an error.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut contracts = self.load().await?;

        let before = contracts.len();
        contracts.retain(|c| c.id != id);
        self.persist(&contracts).await?;

        tracing::info!("Deleted contract {} ({} removed)", id, before - contracts.len());
        Ok(())
    }

    async fn load(&self) -> Result<Vec<Contract>, StoreError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                tracing::error!("Error reading contracts file {}: {}", self.path.display(), e);
                return Err(StoreError::Unavailable(e));
            }
        };

        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::error!("Contracts file {} is not valid: {}", self.path.display(), e);
            StoreError::Corrupt(e)
        })
    }

    async fn persist(&self, contracts: &[Contract]) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await.map_err(StoreError::Write)?;
        }

        let json = serde_json::to_vec_pretty(contracts).map_err(StoreError::Encode)?;
        let tmp = self.tmp_path();
        fs::write(&tmp, json).await.map_err(StoreError::Write)?;
        fs::rename(&tmp, &self.path).await.map_err(StoreError::Write)?;

        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "contracts.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Time-based id, bumped past any id already taken in the same millisecond.
fn generate_id(contracts: &[Contract], mut millis: i64) -> String {
    loop {
        let id = millis.to_string();
        if !contracts.iter().any(|c| c.id == id) {
            return id;
        }
        millis += 1;
    }
}
