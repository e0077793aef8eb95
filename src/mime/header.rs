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

//! Splitting and unfolding of RFC 5322 header blocks.

use std::borrow::Cow;

use lazy_static::lazy_static;
use log::debug;
use memchr::memmem;

use super::model::Header;

lazy_static! {
    static ref LINE_ENDING: regex::bytes::Regex =
        regex::bytes::Regex::new(r"\r?\n").unwrap();
}

/// Rewrites every line ending in `raw`, bare LF or CRLF, as CRLF.
///
/// Signatures over MIME parts are made over the canonical CRLF form, so this
/// must happen exactly once, before anything else looks at the message.
pub fn canonicalise_line_endings(raw: &[u8]) -> Cow<[u8]> {
    LINE_ENDING.replace_all(raw, &b"\r\n"[..])
}

/// Splits a canonicalised entity into its header and its body.
///
/// The header ends at the first empty line; a body that starts with an
/// empty line has no header fields at all. If there is no empty line, the
/// whole entity is header and the body is empty.
pub fn split_header_block(entity: &[u8]) -> (Header, &[u8]) {
    let (header_block, body) = if let Some(rest) = entity.strip_prefix(b"\r\n")
    {
        (&[][..], rest)
    } else if let Some(end) = memmem::find(entity, b"\r\n\r\n") {
        (&entity[..end], &entity[end + 4..])
    } else {
        (entity, &[][..])
    };

    (parse_header_block(header_block), body)
}

fn parse_header_block(block: &[u8]) -> Header {
    let mut header = Header::new();
    let mut current: Option<(String, String)> = None;

    for line in block.split(|&b| b'\n' == b) {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() {
            continue;
        }

        if line[0] == b' ' || line[0] == b'\t' {
            if let Some((_, ref mut value)) = current {
                let segment = String::from_utf8_lossy(line);
                let segment = segment.trim();
                if !segment.is_empty() {
                    if !value.is_empty() {
                        value.push(' ');
                    }
                    value.push_str(segment);
                }
            } else {
                debug!("Ignoring header continuation without a field");
            }
            continue;
        }

        if let Some((name, value)) = current.take() {
            header.add(name, value);
        }

        let line = String::from_utf8_lossy(line);
        match line.split_once(':') {
            Some((name, value)) if !name.trim().is_empty() => {
                current =
                    Some((name.trim().to_owned(), value.trim().to_owned()));
            },
            _ => debug!("Ignoring malformed header line {:?}", line),
        }
    }

    if let Some((name, value)) = current {
        header.add(name, value);
    }

    header
}

/// The `Content-Transfer-Encoding` of an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentTransferEncoding {
    SevenBit,
    EightBit,
    Binary,
    QuotedPrintable,
    Base64,
}

impl Default for ContentTransferEncoding {
    fn default() -> Self {
        ContentTransferEncoding::SevenBit
    }
}

impl ContentTransferEncoding {
    /// Determines the transfer encoding declared in `header`.
    ///
    /// Absent and unrecognised encodings are treated as 7bit, i.e., the
    /// content is taken as-is.
    pub fn of(header: &Header) -> Self {
        header
            .get("Content-Transfer-Encoding")
            .and_then(Self::parse)
            .unwrap_or_default()
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("7bit") {
            Some(ContentTransferEncoding::SevenBit)
        } else if value.eq_ignore_ascii_case("8bit") {
            Some(ContentTransferEncoding::EightBit)
        } else if value.eq_ignore_ascii_case("binary") {
            Some(ContentTransferEncoding::Binary)
        } else if value.eq_ignore_ascii_case("quoted-printable") {
            Some(ContentTransferEncoding::QuotedPrintable)
        } else if value.eq_ignore_ascii_case("base64") {
            Some(ContentTransferEncoding::Base64)
        } else {
            None
        }
    }
}
