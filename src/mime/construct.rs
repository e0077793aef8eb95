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

//! Rendering of outgoing mail as RFC 3156 `multipart/encrypted` messages.

use std::io::Write;

use chrono::prelude::*;
use rand::distributions::Alphanumeric;
use rand::Rng;

use super::header::canonicalise_line_endings;
use super::quoted_printable::qp_encode;
use crate::gpg::{Gpg, PublicKey};
use crate::support::error::Error;
use crate::validator::OutgoingMail;

const SUBJECT: &str = "OpenPGP Key Validation";
const BOUNDARY_LEN: usize = 24;
const BASE64_LINE_LEN: usize = 76;

/// Renders `mail` as a complete message, encrypted to its recipient key and
/// signed by the service key.
pub fn render<G: Gpg>(
    mail: &OutgoingMail<G::Key>,
    gpg: &G,
    now: DateTime<Utc>,
) -> Result<Vec<u8>, Error> {
    let plaintext = render_inner(mail)?;
    let ciphertext = gpg.encrypt_message(&plaintext, &mail.recipient_key)?;
    let ciphertext = canonicalise_line_endings(&ciphertext);

    let from = gpg.server_identity();
    let boundary = generate_boundary();
    let mut out = Vec::<u8>::new();

    write!(
        out,
        "Date: {date}\r\n\
         From: {from}\r\n\
         To: {to}\r\n\
         Message-ID: <{id}@{domain}>\r\n\
         Subject: {subject}\r\n\
         MIME-Version: 1.0\r\n\
         Content-Type: multipart/encrypted; boundary=\"{boundary}\";\r\n\
         \x20protocol=\"application/pgp-encrypted\"\r\n\
         Content-Description: OpenPGP encrypted message\r\n\
         \r\n\
         This is an OpenPGP/MIME encrypted message (RFC 4880 and 3156)\r\n\
         --{boundary}\r\n\
         Content-Type: application/pgp-encrypted\r\n\
         Content-Description: PGP/MIME version identification\r\n\
         \r\n\
         Version: 1\r\n\
         \r\n\
         --{boundary}\r\n\
         Content-Type: application/octet-stream; name=\"encrypted.asc\"\r\n\
         Content-Description: OpenPGP encrypted message\r\n\
         Content-Disposition: inline; filename=\"encrypted.asc\"\r\n\
         \r\n",
        date = now.format("%a, %d %b %Y %H:%M:%S %z"),
        from = encode_header_value(&from),
        to = encode_header_value(&mail.recipient_email),
        id = now.to_rfc3339_opts(SecondsFormat::Nanos, true),
        domain = mail_domain(&from),
        subject = SUBJECT,
        boundary = boundary,
    )?;
    out.extend_from_slice(&ciphertext);
    write!(out, "\r\n--{}--\r\n", boundary)?;

    Ok(out)
}

/// Renders the `multipart/mixed` entity that gets encrypted.
fn render_inner<K: PublicKey>(
    mail: &OutgoingMail<K>,
) -> Result<Vec<u8>, Error> {
    let boundary = generate_boundary();
    let mut out = Vec::<u8>::new();

    write!(
        out,
        "Content-Type: multipart/mixed; boundary=\"{}\"\r\n\r\n",
        boundary
    )?;

    write!(out, "--{}\r\n", boundary)?;
    if mail.message.is_ascii() {
        out.extend_from_slice(
            b"Content-Type: text/plain; charset=us-ascii\r\n\
              Content-Transfer-Encoding: 7bit\r\n\r\n",
        );
        out.extend_from_slice(&canonicalise_line_endings(
            mail.message.as_bytes(),
        ));
    } else {
        out.extend_from_slice(
            b"Content-Type: text/plain; charset=utf-8\r\n\
              Content-Transfer-Encoding: quoted-printable\r\n\r\n",
        );
        out.extend_from_slice(qp_encode(mail.message.as_bytes()).as_bytes());
    }
    out.extend_from_slice(b"\r\n");

    if let Some(ref attachment) = mail.attachment {
        let name = format!("0x{}.asc", mail.recipient_key.key_id());
        write!(
            out,
            "--{boundary}\r\n\
             Content-Type: application/pgp-keys; name=\"{name}\"\r\n\
             Content-Description: Your OpenPGP key\r\n\
             Content-Disposition: attachment; filename=\"{name}\"\r\n",
            boundary = boundary,
            name = name,
        )?;

        if attachment.is_ascii() {
            out.extend_from_slice(b"Content-Transfer-Encoding: 7bit\r\n\r\n");
            out.extend_from_slice(&canonicalise_line_endings(attachment));
        } else {
            out.extend_from_slice(b"Content-Transfer-Encoding: base64\r\n\r\n");
            let encoded = base64::encode(attachment);
            for line in encoded.as_bytes().chunks(BASE64_LINE_LEN) {
                out.extend_from_slice(line);
                out.extend_from_slice(b"\r\n");
            }
        }
        out.extend_from_slice(b"\r\n");
    }

    write!(out, "--{}--\r\n", boundary)?;
    Ok(out)
}

fn generate_boundary() -> String {
    let random = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(BOUNDARY_LEN)
        .map(char::from)
        .collect::<String>();
    format!("vouch-{}", random)
}

/// The domain part of a mailbox such as `Name <user@example.com>`.
fn mail_domain(mailbox: &str) -> &str {
    mailbox
        .rsplit_once('@')
        .map_or("localhost", |(_, domain)| domain)
        .trim_end_matches('>')
        .trim()
}

/// Applies RFC 2047 Q encoding to `value` if it is not plain ASCII.
fn encode_header_value(value: &str) -> String {
    if value.is_ascii() {
        return value.to_owned();
    }

    let mut out = "=?utf-8?Q?".to_owned();
    for &b in value.as_bytes() {
        match b {
            b' ' => out.push('_'),
            b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'!' | b'*' | b'+'
            | b'-' | b'/' | b'@' | b'.' => out.push(b as char),
            _ => out.push_str(&format!("={:02X}", b)),
        }
    }
    out.push_str("?=");
    out
}
