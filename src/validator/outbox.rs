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

use chrono::prelude::*;
use log::info;

use super::outgoing::MailKind;
use crate::support::error::Error;
use crate::support::file_ops;
use crate::support::system_config::OutboxConfig;

/// Where rendered mail goes.
///
/// Transport to the recipient is the business of whatever sits behind the
/// outbox. A successful `send` means only that the mail was handed over.
pub trait Outbox: Send + Sync {
    fn send(
        &self,
        kind: MailKind,
        recipient: &str,
        message: &[u8],
    ) -> Result<(), Error>;
}

/// An `Outbox` which writes each mail into a spool directory, for pickup by
/// a mail transfer agent.
///
/// Files are named `<kind>_<unix time>_<recipient>.eml` and appear
/// atomically.
pub struct SpoolOutbox {
    dir: PathBuf,
}

impl SpoolOutbox {
    /// Opens the spool at `dir`, creating it if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, Error> {
        let dir = dir.as_ref().to_owned();
        fs::create_dir_all(&dir)?;
        Ok(SpoolOutbox { dir })
    }

    /// Opens the spool directory named by `config`.
    pub fn open(config: &OutboxConfig) -> Result<Self, Error> {
        Self::new(&config.spool)
    }
}

impl Outbox for SpoolOutbox {
    fn send(
        &self,
        kind: MailKind,
        recipient: &str,
        message: &[u8],
    ) -> Result<(), Error> {
        let stem = format!(
            "{}_{}_{}",
            kind,
            Utc::now().timestamp(),
            safe_name(recipient)
        );

        let mut attempt = 0u32;
        loop {
            let name = if 0 == attempt {
                format!("{}.eml", stem)
            } else {
                format!("{}_{}.eml", stem, attempt)
            };
            let path = self.dir.join(&name);

            match file_ops::spit(&self.dir, &path, false, 0o640, message) {
                Ok(()) => {
                    info!(
                        "Spooled {} mail for {} as {}",
                        kind, recipient, name
                    );
                    return Ok(());
                },
                Err(e) if io::ErrorKind::AlreadyExists == e.kind() => {
                    attempt += 1;
                },
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Makes `s` usable as part of a file name.
fn safe_name(s: &str) -> String {
    let mut name = s
        .chars()
        .map(|c| {
            if c.is_control() || '/' == c || '\\' == c {
                '_'
            } else {
                c
            }
        })
        .collect::<String>();
    if name.starts_with('.') {
        name.insert(0, '_');
    }
    name
}
