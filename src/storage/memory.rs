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

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::prelude::*;

use super::{RequestInfo, Storage};
use crate::support::error::Error;
use crate::validator::Nonce;

/// Keeps requests in process memory. Everything is lost on restart.
pub struct MemoryStore<K> {
    requests: Mutex<HashMap<Nonce, RequestInfo<K>>>,
}

impl<K> MemoryStore<K> {
    pub fn new() -> Self {
        MemoryStore {
            requests: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        0 == self.len()
    }
}

impl<K> Default for MemoryStore<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + Send> Storage<K> for MemoryStore<K> {
    fn get(&self, nonce: &Nonce) -> Result<Option<RequestInfo<K>>, Error> {
        Ok(self.requests.lock().unwrap().get(nonce).cloned())
    }

    fn set(&self, nonce: &Nonce, info: RequestInfo<K>) -> Result<(), Error> {
        self.requests.lock().unwrap().insert(*nonce, info);
        Ok(())
    }

    fn delete(&self, nonce: &Nonce) -> Result<(), Error> {
        self.requests.lock().unwrap().remove(nonce);
        Ok(())
    }

    fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, Error> {
        let mut requests = self.requests.lock().unwrap();
        let before = requests.len();
        requests.retain(|_, info| info.timestamp >= cutoff);
        Ok(before - requests.len())
    }
}
