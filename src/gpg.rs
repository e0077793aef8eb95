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

//! The OpenPGP capability consumed by the parser and the validator.
//!
//! Vouchmail does not implement any OpenPGP cryptography itself. Everything
//! involving key material goes through an implementation of `Gpg`, which owns
//! both the service's private key and the representation of public keys.

use std::fmt;

use thiserror::Error;

/// Reasons an OpenPGP operation can fail.
#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot read key: {0}")]
    MalformedKey(String),
    #[error("bad signature: {0}")]
    BadSignature(String),
    #[error("message is not encrypted")]
    NotEncrypted,
    #[error("message is not signed")]
    NotSigned,
    #[error("message is signed by {actual}, expected {expected}")]
    WrongSigner { expected: String, actual: String },
    #[error("key has no identity for {0}")]
    NoSuchIdentity(String),
    #[error("OpenPGP backend error: {0}")]
    Backend(String),
}

/// Read-only view of a parsed OpenPGP public key.
pub trait PublicKey: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// The full fingerprint of the primary key, as upper-case hex.
    fn fingerprint(&self) -> String;
    /// The short (64-bit) key ID of the primary key, as upper-case hex.
    fn key_id(&self) -> String;
    /// The email addresses of all user IDs bound to the key, in key order.
    fn emails(&self) -> Vec<String>;
}

/// The operations Vouchmail needs from an OpenPGP implementation.
///
/// All data passes as complete in-memory buffers; mails are small and are
/// already held in memory by the time they are parsed.
pub trait Gpg: Send + Sync {
    type Key: PublicKey;

    /// Parses a public key, armoured or binary.
    fn read_key(&self, data: &[u8]) -> Result<Self::Key, Error>;

    /// Serialises the public parts of `key` into a form `read_key` accepts.
    fn export_key(&self, key: &Self::Key) -> Result<Vec<u8>, Error>;

    /// Checks that `signature` is a valid detached signature by `signer` over
    /// exactly the bytes of `message`.
    fn check_message_signature(
        &self,
        message: &[u8],
        signature: &[u8],
        signer: &Self::Key,
    ) -> Result<(), Error>;

    /// Encrypts `plaintext` to `recipient` and signs it with the service key,
    /// producing an armoured message.
    fn encrypt_message(
        &self,
        plaintext: &[u8],
        recipient: &Self::Key,
    ) -> Result<Vec<u8>, Error>;

    /// Decrypts `ciphertext` with the service key without looking at any
    /// signature it might carry.
    fn decrypt_message(&self, ciphertext: &[u8]) -> Result<Vec<u8>, Error>;

    /// Decrypts `ciphertext` and requires it to carry a valid embedded
    /// signature made by `signer`.
    fn decrypt_signed_message(
        &self,
        ciphertext: &[u8],
        signer: &Self::Key,
    ) -> Result<Vec<u8>, Error>;

    /// Certifies the user ID of `key` bound to `email` with the service key
    /// and returns the resulting armoured public key.
    ///
    /// Only that one user ID is certified, never the other identities of the
    /// key.
    fn sign_user_id(
        &self,
        email: &str,
        key: &Self::Key,
    ) -> Result<Vec<u8>, Error>;

    /// The service's own mailbox, used as the `From` of outgoing mail.
    fn server_identity(&self) -> String;
}
