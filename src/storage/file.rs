//-
// Copyright (c) 2020, 2024, Jason Lingle
//
// This file is part of Vouchmail.
//
// Vouchmail is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Vouchmail is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along with
// Vouchmail. If not, see <http://www.gnu.org/licenses/>.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::prelude::*;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::{RequestInfo, Storage};
use crate::gpg::Gpg;
use crate::support::error::Error;
use crate::support::file_ops;
use crate::validator::Nonce;

/// Keeps each request as a CBOR file named after its nonce.
///
/// Keys are stored in the form `Gpg::export_key` produces and are read back
/// through the same `Gpg`, so the files are independent of the in-memory key
/// representation.
pub struct FileStore<G> {
    root: PathBuf,
    gpg: Arc<G>,
    // Serialises purges against writes in this process. Individual files
    // are always replaced atomically.
    lock: Mutex<()>,
}

#[derive(Serialize, Deserialize)]
struct StoredRequest {
    email: String,
    timestamp: DateTime<Utc>,
    #[serde(with = "serde_bytes")]
    key: Vec<u8>,
}

impl<G: Gpg> FileStore<G> {
    /// Opens the store at `root`, creating the directory if needed.
    pub fn new(root: impl AsRef<Path>, gpg: Arc<G>) -> Result<Self, Error> {
        let root = root.as_ref().to_owned();
        fs::create_dir_all(&root)?;
        Ok(FileStore {
            root,
            gpg,
            lock: Mutex::new(()),
        })
    }

    fn path(&self, nonce: &Nonce) -> PathBuf {
        self.root.join(format!("{}.cbor", nonce.to_hex()))
    }

    fn read(&self, path: &Path) -> Result<Option<StoredRequest>, Error> {
        match fs::File::open(path) {
            Ok(f) => Ok(Some(serde_cbor::from_reader(io::BufReader::new(f))?)),
            Err(e) if io::ErrorKind::NotFound == e.kind() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl<G: Gpg> Storage<G::Key> for FileStore<G> {
    fn get(&self, nonce: &Nonce) -> Result<Option<RequestInfo<G::Key>>, Error> {
        let stored = match self.read(&self.path(nonce))? {
            Some(stored) => stored,
            None => return Ok(None),
        };

        Ok(Some(RequestInfo {
            key: self.gpg.read_key(&stored.key)?,
            email: stored.email,
            timestamp: stored.timestamp,
        }))
    }

    fn set(
        &self,
        nonce: &Nonce,
        info: RequestInfo<G::Key>,
    ) -> Result<(), Error> {
        let stored = StoredRequest {
            key: self.gpg.export_key(&info.key)?,
            email: info.email,
            timestamp: info.timestamp,
        };
        let data = serde_cbor::to_vec(&stored)?;

        let _lock = self.lock.lock().unwrap();
        file_ops::spit(&self.root, self.path(nonce), true, 0o600, &data)?;
        Ok(())
    }

    fn delete(&self, nonce: &Nonce) -> Result<(), Error> {
        let _lock = self.lock.lock().unwrap();
        file_ops::remove_if_exists(self.path(nonce))?;
        Ok(())
    }

    fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, Error> {
        let _lock = self.lock.lock().unwrap();
        let mut purged = 0;

        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if Some("cbor") != path.extension().and_then(|e| e.to_str()) {
                continue;
            }

            let stored = match self.read(&path) {
                Ok(Some(stored)) => stored,
                Ok(None) => continue,
                Err(e) => {
                    warn!(
                        "Skipping unreadable request {}: {}",
                        path.display(),
                        e
                    );
                    continue;
                },
            };

            if stored.timestamp < cutoff && file_ops::remove_if_exists(&path)? {
                debug!("Purged {}", path.display());
                purged += 1;
            }
        }

        Ok(purged)
    }
}
