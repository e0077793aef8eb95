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

use std::io;

use thiserror::Error;

use crate::gpg;

#[derive(Error, Debug)]
pub enum Error {
    #[error("malformed media type {0:?}")]
    MalformedMediaType(String),
    #[error("{0} entity has no boundary parameter")]
    MissingBoundary(String),
    #[error("multipart body ended before its closing delimiter")]
    UnterminatedMultipart,
    #[error("MIME structure nested too deeply")]
    NestingTooDeep,
    #[error("multipart/signed entity has no micalg parameter")]
    MissingMicalg,
    #[error("multipart/signed body must contain two parts, but got {0}")]
    SignedPartCount(usize),
    #[error("cannot locate the signed content within the raw body")]
    SignedContentNotFound,
    #[error(
        "signature part has content type {0:?}, \
         not application/pgp-signature"
    )]
    UnexpectedSignatureType(String),
    #[error("multipart/encrypted protocol must be application/pgp-encrypted")]
    UnexpectedEncryptionProtocol,
    #[error("multipart/encrypted body must contain two parts, but got {0}")]
    EncryptedPartCount(usize),
    #[error(
        "first multipart/encrypted part must be \
         application/pgp-encrypted with content 'Version: 1'"
    )]
    BadEncryptionVersionPart,
    #[error("second multipart/encrypted part must be an attachment")]
    CiphertextNotAttachment,
    #[error("no attachment of type {0:?}")]
    AttachmentNotFound(&'static str),
    #[error("invalid nonce: {0}")]
    InvalidNonce(String),
    #[error("nonce {0} not found")]
    NonceNotFound(String),
    #[error("nonce {0} has expired")]
    NonceExpired(String),
    #[error("confirmation queue is shut down")]
    QueueClosed,
    #[error("cannot configure logging: {0}")]
    Logging(String),
    #[error(transparent)]
    Gpg(#[from] gpg::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Cbor(#[from] serde_cbor::Error),
    #[error(transparent)]
    Config(#[from] toml::de::Error),
    #[error(transparent)]
    Random(#[from] rand::Error),
}
