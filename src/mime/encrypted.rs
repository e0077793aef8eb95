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

//! RFC 3156 `multipart/encrypted` handling.
//!
//! An encrypted entity is replaced by the entity it decrypts to. The payload
//! must carry an embedded signature by the key attached inside it; anything
//! less is an error rather than an unsigned result.

use log::info;

use super::header::canonicalise_line_endings;
use super::media_type::MediaType;
use super::model::{Header, MimeEntity};
use super::parser::Parser;
use crate::gpg::{Gpg, PublicKey};
use crate::support::error::Error;

impl<'a, G: Gpg> Parser<'a, G> {
    pub(super) fn parse_multipart_encrypted(
        &self,
        content_type: &MediaType,
        header: Header,
        body: &[u8],
        depth: usize,
    ) -> Result<MimeEntity<G::Key>, Error> {
        if Some("application/pgp-encrypted") != content_type.param("protocol")
        {
            return Err(Error::UnexpectedEncryptionProtocol);
        }

        let wrapper = self.parse_multipart(content_type, header, body, depth)?;
        let ciphertext = ciphertext(&wrapper)?;

        // The signer key travels inside the encrypted payload, so it can only
        // be found after a first decryption which ignores signatures.
        let plaintext = self.gpg.decrypt_message(ciphertext)?;
        let mut inner = self.parse_canonical(
            &canonicalise_line_endings(&plaintext),
            depth + 1,
        )?;
        let signer = self.find_signer_key(&inner)?;

        self.gpg.decrypt_signed_message(ciphertext, &signer)?;
        info!(
            "{} Decrypted payload signed by {}",
            self.log_prefix,
            signer.fingerprint()
        );

        inner.signed_by = Some(signer);
        Ok(inner)
    }
}

/// Validates the two-part structure of a `multipart/encrypted` entity and
/// returns the ciphertext.
fn ciphertext<K>(wrapper: &MimeEntity<K>) -> Result<&[u8], Error> {
    let parts = wrapper.parts();
    if 2 != parts.len() {
        return Err(Error::EncryptedPartCount(parts.len()));
    }

    let version = &parts[0];
    if "application/pgp-encrypted" != version.content_type().value
        || Some(&b"Version: 1"[..]) != version.content().map(trim_ascii)
    {
        return Err(Error::BadEncryptionVersionPart);
    }

    if !parts[1].is_attachment() {
        return Err(Error::CiphertextNotAttachment);
    }

    parts[1]
        .content()
        .map(trim_ascii)
        .ok_or(Error::CiphertextNotAttachment)
}

fn trim_ascii(mut s: &[u8]) -> &[u8] {
    while let Some((first, rest)) = s.split_first() {
        if !first.is_ascii_whitespace() {
            break;
        }
        s = rest;
    }
    while let Some((last, rest)) = s.split_last() {
        if !last.is_ascii_whitespace() {
            break;
        }
        s = rest;
    }
    s
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::gpg;
    use crate::mime::parser::parse_mail;
    use crate::support::system_config::ParserConfig;
    use crate::test_data::*;

    fn parse(gpg: &FakeGpg, raw: &str) -> Result<MimeEntity<FakeKey>, Error> {
        parse_mail(gpg, ParserConfig::default(), raw.as_bytes())
    }

    fn zim() -> FakeKey {
        FakeKey::new("F1F1", &["zim@irk.example"])
    }

    #[test]
    fn signed_payload_is_returned_with_signer() {
        let gpg = FakeGpg::new();
        let key = zim();
        let raw = EncryptedMailBuilder::new(&key_mail(&key, "Sign me"))
            .signed_by(&key)
            .build();

        let mail = parse(&gpg, &raw).unwrap();
        assert_eq!(Some(&key), mail.signed_by());
        // The wrapper is gone; this is the decrypted multipart/mixed.
        assert_eq!(
            "multipart/mixed",
            mail.content_type().value
        );
        assert_eq!(Some(&b"Sign me"[..]), mail.parts()[0].content());
    }

    #[test]
    fn unsigned_payload_is_fatal() {
        let gpg = FakeGpg::new();
        let raw =
            EncryptedMailBuilder::new(&key_mail(&zim(), "Sign me")).build();
        assert_matches!(
            Err(Error::Gpg(gpg::Error::NotSigned)),
            parse(&gpg, &raw)
        );
    }

    #[test]
    fn payload_signed_by_other_key_is_fatal() {
        let gpg = FakeGpg::new();
        let raw = EncryptedMailBuilder::new(&key_mail(&zim(), "Sign me"))
            .signed_by(&FakeKey::new("D1D1", &["dib@earth.example"]))
            .build();
        assert_matches!(
            Err(Error::Gpg(gpg::Error::WrongSigner { .. })),
            parse(&gpg, &raw)
        );
    }

    #[test]
    fn payload_without_key_is_fatal() {
        let gpg = FakeGpg::new();
        let key = zim();
        let raw = EncryptedMailBuilder::new(
            "Content-Type: text/plain\r\n\r\nno key here\r\n",
        )
        .signed_by(&key)
        .build();
        assert_matches!(
            Err(Error::AttachmentNotFound("application/pgp-keys")),
            parse(&gpg, &raw)
        );
    }

    #[test]
    fn bad_structure_is_fatal() {
        let gpg = FakeGpg::new();
        let key = zim();
        let payload = key_mail(&key, "Sign me");

        assert_matches!(
            Err(Error::UnexpectedEncryptionProtocol),
            parse(
                &gpg,
                &EncryptedMailBuilder::new(&payload)
                    .signed_by(&key)
                    .protocol("application/pkcs7-mime")
                    .build()
            )
        );
        assert_matches!(
            Err(Error::BadEncryptionVersionPart),
            parse(
                &gpg,
                &EncryptedMailBuilder::new(&payload)
                    .signed_by(&key)
                    .version("Version: 2")
                    .build()
            )
        );
        assert_matches!(
            Err(Error::CiphertextNotAttachment),
            parse_mail(
                &gpg,
                ParserConfig {
                    inline_as_attachment: false,
                },
                EncryptedMailBuilder::new(&payload)
                    .signed_by(&key)
                    .build()
                    .as_bytes(),
            )
        );
    }

    #[test]
    fn wrong_part_count_is_fatal() {
        let gpg = FakeGpg::new();
        let body = MultipartBuilder::new("enc")
            .part("application/pgp-encrypted", "Version: 1")
            .build();
        assert_matches!(
            Err(Error::EncryptedPartCount(1)),
            parse(
                &gpg,
                &format!(
                    "Content-Type: multipart/encrypted; boundary=enc; \
                     protocol=\"application/pgp-encrypted\"\r\n\r\n{}",
                    body
                )
            )
        );
    }

    #[test]
    fn ciphertext_not_for_us_is_fatal() {
        let gpg = FakeGpg::new();
        let body = MultipartBuilder::new("enc")
            .part("application/pgp-encrypted", "Version: 1")
            .part_with_header(
                &[
                    ("Content-Type", "application/octet-stream"),
                    ("Content-Disposition", "inline; filename=encrypted.asc"),
                ],
                "-----BEGIN PGP MESSAGE-----",
            )
            .build();
        assert_matches!(
            Err(Error::Gpg(gpg::Error::NotEncrypted)),
            parse(
                &gpg,
                &format!(
                    "Content-Type: multipart/encrypted; boundary=enc; \
                     protocol=\"application/pgp-encrypted\"\r\n\r\n{}",
                    body
                )
            )
        );
    }

    #[test]
    fn trims_ascii_whitespace() {
        assert_eq!(b"Version: 1", trim_ascii(b" \r\nVersion: 1\r\n\r\n"));
        assert_eq!(b"", trim_ascii(b" \t "));
    }
}
