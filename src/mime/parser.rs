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

//! Recursive parsing of raw mail into a `MimeEntity` tree.
//!
//! The parser only understands as much MIME as is needed to get at
//! OpenPGP-signed and OpenPGP-encrypted content: generic multiparts,
//! attachments, and text. `multipart/signed` and `multipart/encrypted` are
//! handled in the `signed` and `encrypted` modules respectively.

use log::debug;

use super::content_encoding::{decode_charset, decode_transfer_encoding};
use super::header::{
    canonicalise_line_endings, split_header_block, ContentTransferEncoding,
};
use super::media_type::{self, MediaType};
use super::model::{Header, MimeEntity};
use super::multipart;
use crate::gpg::Gpg;
use crate::support::error::Error;
use crate::support::log_prefix::LogPrefix;
use crate::support::system_config::ParserConfig;

/// The maximum depth of nested entities.
///
/// Each multipart level and each decrypted payload counts as one level.
pub const MAX_RECURSION: usize = 20;

/// The closed set of ways an entity can be interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EntityKind {
    Attachment,
    Signed,
    Encrypted,
    Multipart,
    Text,
}

/// Parses raw mail, verifying any OpenPGP signatures found along the way
/// through `gpg`.
pub struct Parser<'a, G: Gpg> {
    pub(super) gpg: &'a G,
    config: ParserConfig,
    pub(super) log_prefix: LogPrefix,
}

/// Parses a complete raw mail with a fresh `Parser`.
pub fn parse_mail<G: Gpg>(
    gpg: &G,
    config: ParserConfig,
    raw: &[u8],
) -> Result<MimeEntity<G::Key>, Error> {
    Parser::new(gpg, config, LogPrefix::new("parse".to_owned())).parse_mail(raw)
}

impl<'a, G: Gpg> Parser<'a, G> {
    pub fn new(
        gpg: &'a G,
        config: ParserConfig,
        log_prefix: LogPrefix,
    ) -> Self {
        Parser {
            gpg,
            config,
            log_prefix,
        }
    }

    /// Parses a complete raw mail, header block and body.
    ///
    /// Line endings are canonicalised to CRLF before anything else happens.
    pub fn parse_mail(&self, raw: &[u8]) -> Result<MimeEntity<G::Key>, Error> {
        let canonical = canonicalise_line_endings(raw);
        self.parse_canonical(&canonical, 0)
    }

    /// Parses an entity whose line endings are already canonical.
    pub(super) fn parse_canonical(
        &self,
        data: &[u8],
        depth: usize,
    ) -> Result<MimeEntity<G::Key>, Error> {
        let (header, body) = split_header_block(data);
        self.parse_entity(header, body, depth)
    }

    /// Parses the entity with the given header and raw body.
    ///
    /// `depth` is the number of entities enclosing this one.
    pub fn parse_entity(
        &self,
        header: Header,
        body: &[u8],
        depth: usize,
    ) -> Result<MimeEntity<G::Key>, Error> {
        if depth > MAX_RECURSION {
            return Err(Error::NestingTooDeep);
        }

        let disposition =
            media_type::resolve(&header, "Content-Disposition", "")?;
        let content_type =
            media_type::resolve(&header, "Content-Type", "text/plain")?;

        let kind = self.classify(&disposition, &content_type);
        debug!(
            "{} Parsing {} at depth {} as {:?}",
            self.log_prefix, content_type.value, depth, kind
        );

        match kind {
            EntityKind::Attachment => Ok(self.parse_attachment(header, body)),
            EntityKind::Signed => {
                self.parse_multipart_signed(&content_type, header, body, depth)
            },
            EntityKind::Encrypted => self.parse_multipart_encrypted(
                &content_type,
                header,
                body,
                depth,
            ),
            EntityKind::Multipart => {
                self.parse_multipart(&content_type, header, body, depth)
            },
            EntityKind::Text => {
                Ok(self.parse_text(&content_type, header, body))
            },
        }
    }

    fn classify(
        &self,
        disposition: &MediaType,
        content_type: &MediaType,
    ) -> EntityKind {
        let attachment = match &*disposition.value {
            "attachment" => true,
            "inline" => {
                self.config.inline_as_attachment && !content_type.is_text()
            },
            _ => false,
        };

        if attachment {
            EntityKind::Attachment
        } else if "multipart/signed" == content_type.value {
            EntityKind::Signed
        } else if "multipart/encrypted" == content_type.value {
            EntityKind::Encrypted
        } else if content_type.is_multipart() {
            EntityKind::Multipart
        } else {
            EntityKind::Text
        }
    }

    fn parse_attachment(
        &self,
        header: Header,
        body: &[u8],
    ) -> MimeEntity<G::Key> {
        let content =
            decode_transfer_encoding(ContentTransferEncoding::of(&header), body)
                .into_owned();
        MimeEntity::leaf(header, content, true)
    }

    fn parse_text(
        &self,
        content_type: &MediaType,
        header: Header,
        body: &[u8],
    ) -> MimeEntity<G::Key> {
        let cte = ContentTransferEncoding::of(&header);
        let decoded = decode_transfer_encoding(cte, body);
        let content = match content_type.param("charset") {
            Some(charset) => decode_charset(charset, &decoded).into_bytes(),
            None => decoded.into_owned(),
        };
        MimeEntity::leaf(header, content, false)
    }

    /// Splits a generic multipart body and parses each part recursively.
    pub(super) fn parse_multipart(
        &self,
        content_type: &MediaType,
        header: Header,
        body: &[u8],
        depth: usize,
    ) -> Result<MimeEntity<G::Key>, Error> {
        let boundary = content_type
            .param("boundary")
            .ok_or_else(|| Error::MissingBoundary(content_type.value.clone()))?;

        let parts = multipart::split(body, boundary)?
            .into_iter()
            .map(|part| self.parse_canonical(part, depth + 1))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MimeEntity::composite(header, parts))
    }
}
