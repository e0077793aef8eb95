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

//! Persistence of pending validation requests.
//!
//! A request lives in storage from the moment its challenge is issued until
//! the nonce is confirmed (or the request expires). Implementations
//! serialise their own operations; callers add no locking.

use std::sync::Arc;

use chrono::prelude::*;
use log::info;

use crate::gpg::Gpg;
use crate::support::error::Error;
use crate::support::system_config::{StorageBackend, StorageConfig};
use crate::validator::Nonce;

pub mod file;
pub mod memory;

/// What is remembered about a request between challenge and confirmation.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestInfo<K> {
    /// The key whose identity is to be countersigned.
    pub key: K,
    /// The one identity of `key` the challenge was sent to.
    pub email: String,
    /// When the challenge was issued.
    pub timestamp: DateTime<Utc>,
}

pub trait Storage<K>: Send + Sync {
    /// Looks up the request stored under `nonce`.
    fn get(&self, nonce: &Nonce) -> Result<Option<RequestInfo<K>>, Error>;

    /// Stores `info` under `nonce`, replacing anything already there.
    fn set(&self, nonce: &Nonce, info: RequestInfo<K>) -> Result<(), Error>;

    /// Removes the request stored under `nonce`. Removing a request that
    /// does not exist is not an error.
    fn delete(&self, nonce: &Nonce) -> Result<(), Error>;

    /// Removes every request issued before `cutoff`, returning how many
    /// were removed.
    fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, Error>;
}

/// Opens the storage backend selected by `config`.
pub fn open<G: Gpg + 'static>(
    config: &StorageConfig,
    gpg: Arc<G>,
) -> Result<Arc<dyn Storage<G::Key>>, Error> {
    match config.backend {
        StorageBackend::Memory => {
            info!("Keeping pending requests in memory");
            Ok(Arc::new(memory::MemoryStore::new()))
        },
        StorageBackend::File => {
            info!("Keeping pending requests in {}", config.path.display());
            Ok(Arc::new(file::FileStore::new(&config.path, gpg)?))
        },
    }
}
