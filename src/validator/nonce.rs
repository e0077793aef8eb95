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

use std::fmt;
use std::str::FromStr;

use rand::{rngs::OsRng, RngCore};

use crate::support::error::Error;

pub const NONCE_LEN: usize = 32;

/// A single-use secret which proves that its bearer received a challenge
/// mail.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nonce([u8; NONCE_LEN]);

impl Nonce {
    /// Generates a fresh nonce from the operating system's CSPRNG.
    pub fn generate() -> Result<Self, Error> {
        let mut data = [0u8; NONCE_LEN];
        OsRng.try_fill_bytes(&mut data)?;
        Ok(Nonce(data))
    }

    pub fn from_bytes(data: [u8; NONCE_LEN]) -> Self {
        Nonce(data)
    }

    /// Parses the hexadecimal form of a nonce, in either case.
    pub fn from_hex(s: &str) -> Result<Self, Error> {
        let bytes =
            hex::decode(s).map_err(|e| Error::InvalidNonce(e.to_string()))?;
        let mut data = [0u8; NONCE_LEN];
        if bytes.len() != NONCE_LEN {
            return Err(Error::InvalidNonce(format!(
                "expected {} bytes, got {}",
                NONCE_LEN,
                bytes.len()
            )));
        }
        data.copy_from_slice(&bytes);
        Ok(Nonce(data))
    }

    /// Returns the lower-case hexadecimal form of the nonce.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }

    /// A form of the nonce safe to put in logs and error messages.
    pub fn redacted(&self) -> String {
        format!("{}...", &self.to_hex()[..8])
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Nonce({})", self.redacted())
    }
}

impl FromStr for Nonce {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        Self::from_hex(s.trim())
    }
}
