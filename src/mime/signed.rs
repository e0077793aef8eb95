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

//! RFC 3156 `multipart/signed` handling.
//!
//! The signature covers the first part exactly as it was transmitted (after
//! line ending canonicalisation), so the signed bytes are cut out of the raw
//! body rather than reconstructed from the parsed tree.

use log::{info, warn};

use super::media_type::MediaType;
use super::model::{Header, MimeEntity};
use super::multipart;
use super::parser::Parser;
use crate::gpg::{Gpg, PublicKey};
use crate::support::error::Error;

impl<'a, G: Gpg> Parser<'a, G> {
    /// Parses a `multipart/signed` entity and tries to verify its signature.
    ///
    /// Structural problems are errors. A signature that cannot be verified is
    /// not: the entity is returned without `signed_by`, and the reason is
    /// logged.
    pub(super) fn parse_multipart_signed(
        &self,
        content_type: &MediaType,
        header: Header,
        body: &[u8],
        depth: usize,
    ) -> Result<MimeEntity<G::Key>, Error> {
        // The algorithm is implied by the signature packet itself, so the
        // value is not checked.
        if content_type.param("micalg").is_none() {
            return Err(Error::MissingMicalg);
        }

        let mut entity =
            self.parse_multipart(content_type, header, body, depth)?;
        match self.verify_signed(content_type, &entity, body) {
            Ok(signer) => {
                info!(
                    "{} Valid signature by {}",
                    self.log_prefix,
                    signer.fingerprint()
                );
                entity.signed_by = Some(signer);
            },
            Err(e) => {
                warn!(
                    "{} Entity has no valid signature: {}",
                    self.log_prefix, e
                )
            },
        }

        Ok(entity)
    }

    fn verify_signed(
        &self,
        content_type: &MediaType,
        entity: &MimeEntity<G::Key>,
        raw_body: &[u8],
    ) -> Result<G::Key, Error> {
        let parts = entity.parts();
        if 2 != parts.len() {
            return Err(Error::SignedPartCount(parts.len()));
        }

        let boundary = content_type
            .param("boundary")
            .ok_or_else(|| Error::MissingBoundary(content_type.value.clone()))?;
        let signed_part = find_signed_part(raw_body, boundary)
            .ok_or(Error::SignedContentNotFound)?;

        let signature_type = parts[1].content_type();
        if "application/pgp-signature" != signature_type.value {
            return Err(Error::UnexpectedSignatureType(signature_type.value));
        }
        let signature = parts[1]
            .content()
            .ok_or(Error::AttachmentNotFound("application/pgp-signature"))?;

        let signer = self.find_signer_key(&parts[0])?;
        self.gpg
            .check_message_signature(&signed_part, signature, &signer)?;
        Ok(signer)
    }

    /// Reads the first `application/pgp-keys` attachment within `entity`.
    pub(super) fn find_signer_key(
        &self,
        entity: &MimeEntity<G::Key>,
    ) -> Result<G::Key, Error> {
        let data = entity
            .find_attachment("application/pgp-keys")
            .ok_or(Error::AttachmentNotFound("application/pgp-keys"))?;
        Ok(self.gpg.read_key(data)?)
    }
}

/// Extracts the bytes covered by the signature of a `multipart/signed` body.
///
/// The signed content is the first part exactly as `multipart::split`
/// frames it. Trailing line endings are collapsed into exactly one CRLF.
///
/// Returns `None` if either delimiter cannot be found.
pub fn find_signed_part(raw_body: &[u8], boundary: &str) -> Option<Vec<u8>> {
    let mut signed = multipart::first_part(raw_body, boundary)?;
    while let Some(trimmed) = signed.strip_suffix(b"\r\n") {
        signed = trimmed;
    }

    let mut signed = signed.to_vec();
    signed.extend_from_slice(b"\r\n");
    Some(signed)
}
