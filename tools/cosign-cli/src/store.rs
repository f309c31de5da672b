//! JSON-file persistence for drafts and the address book.
//!
//! The whole store is one document, rewritten through a sibling temp file and a rename so a
//! crash never leaves a half-written file behind.

use std::{
    collections::BTreeMap,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use alloy_primitives::Address;
use async_trait::async_trait;
use cosign_types::{AddressBook, AddressBookEntry, DraftRecord, DraftStore, StoreError};
use serde::{Deserialize, Serialize};
use tokio::{fs, sync::Mutex};
use tracing::debug;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreFile {
    #[serde(default)]
    drafts: BTreeMap<String, DraftRecord>,
    #[serde(default)]
    address_book: Vec<AddressBookEntry>,
}

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

fn io_error(path: &Path, e: std::io::Error) -> StoreError {
    StoreError::Io(format!("{}: {e}", path.display()))
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<StoreFile, StoreError> {
        match fs::read_to_string(&self.path).await {
            Ok(raw) if raw.trim().is_empty() => Ok(StoreFile::default()),
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| StoreError::Corrupt(format!("{}: {e}", self.path.display()))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(StoreFile::default()),
            Err(e) => Err(io_error(&self.path, e)),
        }
    }

    async fn write(&self, file: &StoreFile) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }
        let serialised = serde_json::to_string_pretty(file)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let tmp = tmp_path_for(&self.path);
        fs::write(&tmp, serialised.as_bytes())
            .await
            .map_err(|e| io_error(&tmp, e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| io_error(&self.path, e))
    }

    /// Read-modify-write under the store lock.
    async fn update<T>(
        &self,
        change: impl FnOnce(&mut StoreFile) -> Result<T, StoreError> + Send,
    ) -> Result<T, StoreError> {
        let _guard = self.lock.lock().await;
        let mut file = self.read().await?;
        let out = change(&mut file)?;
        self.write(&file).await?;
        Ok(out)
    }
}

#[async_trait]
impl DraftStore for JsonFileStore {
    async fn save_draft(&self, draft: DraftRecord) -> Result<(), StoreError> {
        debug!(id = %draft.id, transactions = draft.transactions.len(), "saving draft");
        self.update(|file| {
            file.drafts.insert(draft.id.clone(), draft);
            Ok(())
        })
        .await
    }

    async fn load_draft(&self, id: &str) -> Result<DraftRecord, StoreError> {
        let _guard = self.lock.lock().await;
        self.read()
            .await?
            .drafts
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(format!("draft `{id}`")))
    }

    async fn list_drafts(
        &self,
        account: Option<Address>,
        chain_id: Option<u64>,
    ) -> Result<Vec<DraftRecord>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut drafts: Vec<DraftRecord> = self
            .read()
            .await?
            .drafts
            .into_values()
            .filter(|d| account.map_or(true, |a| d.account == a))
            .filter(|d| chain_id.map_or(true, |c| d.chain_id == Some(c)))
            .collect();
        drafts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(drafts)
    }

    async fn delete_draft(&self, id: &str) -> Result<(), StoreError> {
        self.update(|file| {
            file.drafts
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| StoreError::NotFound(format!("draft `{id}`")))
        })
        .await
    }
}

#[async_trait]
impl AddressBook for JsonFileStore {
    async fn upsert_entry(&self, entry: AddressBookEntry) -> Result<(), StoreError> {
        self.update(|file| {
            match file
                .address_book
                .iter_mut()
                .find(|e| e.address == entry.address && e.chain_id == entry.chain_id)
            {
                Some(existing) => existing.name = entry.name,
                None => file.address_book.push(entry),
            }
            Ok(())
        })
        .await
    }

    async fn remove_entry(&self, address: Address, chain_id: u64) -> Result<(), StoreError> {
        self.update(|file| {
            let before = file.address_book.len();
            file.address_book
                .retain(|e| !(e.address == address && e.chain_id == chain_id));
            if file.address_book.len() == before {
                return Err(StoreError::NotFound(format!("{address} on chain {chain_id}")));
            }
            Ok(())
        })
        .await
    }

    async fn entries(&self, chain_id: Option<u64>) -> Result<Vec<AddressBookEntry>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries: Vec<AddressBookEntry> = self
            .read()
            .await?
            .address_book
            .into_iter()
            .filter(|e| chain_id.map_or(true, |c| e.chain_id == c))
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.address.cmp(&b.address)));
        Ok(entries)
    }
}
