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
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::support::error::Error;

/// The system-wide configuration for Vouchmail.
///
/// This is stored in a TOML file, typically `vouchmail.toml`. Every section
/// may be omitted, in which case its defaults apply.
#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct SystemConfig {
    /// Options controlling how inbound mail is interpreted.
    #[serde(default)]
    pub parser: ParserConfig,

    /// Where pending validation requests are kept.
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub nonce: NonceConfig,

    /// Where rendered outgoing mail is placed for the mail transfer agent to
    /// pick up.
    #[serde(default)]
    pub outbox: OutboxConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SystemConfig {
    /// Reads and parses the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ParserConfig {
    /// If true, an entity with `Content-Disposition: inline` whose content
    /// type is not `text/*` is treated as an attachment.
    ///
    /// Many mail user agents send public keys this way.
    pub inline_as_attachment: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            inline_as_attachment: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageBackend {
    /// Requests are held in process memory and lost on restart.
    Memory,
    /// Each request is a file under `storage.path`.
    File,
}

impl Default for StorageBackend {
    fn default() -> Self {
        StorageBackend::Memory
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// The directory used by the `file` backend. It is created if it does
    /// not exist.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            backend: StorageBackend::default(),
            path: PathBuf::from("requests"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct NonceConfig {
    /// If set, the number of seconds after which an unconfirmed request is
    /// no longer honoured.
    ///
    /// By default, requests never expire.
    pub lifetime_secs: Option<u64>,

    /// The prefix of the URL users visit to confirm a nonce. The hex nonce
    /// is appended directly.
    pub confirmation_url: String,
}

// chrono::Duration panics beyond this.
const MAX_LIFETIME_SECS: u64 = i64::MAX as u64 / 1000;

impl NonceConfig {
    pub fn lifetime(&self) -> Option<chrono::Duration> {
        self.lifetime_secs.map(|secs| {
            chrono::Duration::seconds(secs.min(MAX_LIFETIME_SECS) as i64)
        })
    }
}

impl Default for NonceConfig {
    fn default() -> Self {
        NonceConfig {
            lifetime_secs: None,
            confirmation_url: "http://localhost:8080/confirm/".to_owned(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct OutboxConfig {
    /// The spool directory into which rendered mail is written.
    pub spool: PathBuf,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        OutboxConfig {
            spool: PathBuf::from("outbox"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`.
    pub level: String,
    /// If set, log output is also appended to this file.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_owned(),
            file: None,
        }
    }
}
