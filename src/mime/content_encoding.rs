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

//! Decoding of leaf content: transfer encodings and charsets.
//!
//! Decoding is lenient throughout. Malformed input degrades to whatever can
//! be recovered (or to U+FFFD for charsets) and never causes an error.

use std::borrow::Cow;

use super::header::ContentTransferEncoding;
use super::quoted_printable::qp_decode;

/// Removes the transfer encoding `cte` from `data`.
pub fn decode_transfer_encoding(
    cte: ContentTransferEncoding,
    data: &[u8],
) -> Cow<[u8]> {
    use self::ContentTransferEncoding as CTE;

    match cte {
        CTE::SevenBit | CTE::EightBit | CTE::Binary => Cow::Borrowed(data),
        CTE::QuotedPrintable => qp_decode(data),
        CTE::Base64 => Cow::Owned(decode_base64(data)),
    }
}

fn decode_base64(data: &[u8]) -> Vec<u8> {
    let input = data
        .iter()
        .copied()
        .filter(|&byte| {
            matches!(byte,
                     b'0'..=b'9'
                     | b'a'..=b'z'
                     | b'A'..=b'Z'
                     | b'+'
                     | b'/'
                     | b'=')
        })
        .collect::<Vec<u8>>();

    // Trailing garbage that doesn't fill a whole quantum is dropped
    let usable_length = input.len() / 4 * 4;
    let mut decoded = Vec::with_capacity(usable_length / 4 * 3);
    let _ = base64::decode_config_buf(
        &input[..usable_length],
        base64::STANDARD,
        &mut decoded,
    );
    decoded
}

/// Transcodes `data` from the charset named by `label` into UTF-8.
///
/// Unknown labels are treated as UTF-8. Invalid sequences become U+FFFD.
pub fn decode_charset(label: &str, data: &[u8]) -> String {
    let label = label.trim().as_bytes();
    match encoding_rs::Encoding::for_label_no_replacement(label) {
        Some(encoding) => {
            encoding.decode_with_bom_removal(data).0.into_owned()
        },
        None => String::from_utf8_lossy(data).into_owned(),
    }
}
