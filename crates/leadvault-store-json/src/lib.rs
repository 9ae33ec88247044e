#![allow(clippy::missing_errors_doc)]

//! Lead collection persisted as a single pretty-printed JSON array.
//!
//! Every append reads the whole document, pushes one lead and writes the
//! whole document back. Existing records are carried as raw JSON, so fields
//! and identifiers this crate does not model survive an append. The write goes
//! through a temporary sibling file that is renamed over the original.
//!
//! Appends made through one [`JsonFileLeadStore`] are serialized; separate
//! processes (or separate store instances over the same path) still race, and
//! the last writer wins.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use leadvault_core::{Lead, LeadId, LeadStore, StoreError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use ulid::Ulid;

const EMPTY_COLLECTION: &str = "[]\n";

#[derive(Debug)]
pub struct JsonFileLeadStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileLeadStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_collection<T: DeserializeOwned>(&self) -> Result<Vec<T>, StoreError> {
        let body = fs::read_to_string(&self.path).map_err(|source| StoreError::Read {
            path: self.path.clone(),
            source,
        })?;

        serde_json::from_str(&body).map_err(|source| StoreError::Decode {
            path: self.path.clone(),
            source,
        })
    }

    fn write_collection(&self, records: &[Value]) -> Result<(), StoreError> {
        let mut body = serde_json::to_string_pretty(records).map_err(StoreError::Encode)?;
        body.push('\n');
        self.replace_contents(body.as_bytes())
    }

    fn replace_contents(&self, contents: &[u8]) -> Result<(), StoreError> {
        let staging = self.staging_path();
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        let staged = fs::File::create(&staging).and_then(|mut file| {
            file.write_all(contents)?;
            file.sync_all()
        });
        if let Err(source) = staged {
            let _ = fs::remove_file(&staging);
            return Err(write_err(source));
        }

        fs::rename(&staging, &self.path).map_err(|source| {
            let _ = fs::remove_file(&staging);
            write_err(source)
        })
    }

    fn staging_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map_or_else(|| "leads.json".into(), |name| name.to_string_lossy().into_owned());
        self.path.with_file_name(format!(".{file_name}.{}.tmp", Ulid::new()))
    }
}

impl LeadStore for JsonFileLeadStore {
    fn ensure_initialized(&self) -> Result<(), StoreError> {
        let init_err = |source| StoreError::Initialize {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(init_err)?;
        }

        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        match fs::metadata(&self.path) {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                self.replace_contents(EMPTY_COLLECTION.as_bytes())?;
                tracing::info!(path = %self.path.display(), "initialized empty lead collection");
                Ok(())
            }
            Err(err) => Err(init_err(err)),
        }
    }

    fn append_lead(&self, lead: &Lead) -> Result<LeadId, StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;

        let mut records: Vec<Value> = self.read_collection()?;
        records.push(serde_json::to_value(lead).map_err(StoreError::Encode)?);
        self.write_collection(&records)?;

        tracing::debug!(
            lead_id = %lead.lead_id,
            collection_len = records.len(),
            "lead appended to collection"
        );
        Ok(lead.lead_id.clone())
    }

    fn list_leads(&self) -> Result<Vec<Lead>, StoreError> {
        self.read_collection()
    }
}
