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

use std::borrow::Cow;
use std::fmt::Write as _;
use std::str;

/// Decodes quoted-printable encoding, as described by RFC 2045.
///
/// Encoded bytes and soft line endings are both handled, the latter by
/// discarding. UNIX line endings are handled as well as DOS line endings.
///
/// This never fails. Invalid sequences, including an incomplete escape at the
/// very end of the input, are passed through untransformed. Certain
/// restrictions, such as not having trailing whitespace on a line, are not
/// enforced, and are passed through. 8-bit characters are passed through,
/// including invalid UTF-8.
pub fn qp_decode(s: &[u8]) -> Cow<[u8]> {
    let mut transformed = Vec::new();
    let mut dangling: Option<&[u8]> = None;

    let mut split = s.split(|&b| b'=' == b);
    let mut prefix = split.next();

    for element in split {
        if let Some(prefix) = prefix.take() {
            transformed.extend_from_slice(prefix);
        }

        if let Some(dangling) = dangling.take() {
            transformed.push(b'=');
            transformed.extend_from_slice(dangling);
        }

        if element.is_empty() {
            dangling = Some(element);
            continue;
        }

        if b'\n' == element[0] {
            // Soft line break with UNIX ending, discard
            transformed.extend_from_slice(&element[1..]);
            continue;
        }

        // All other = sequences are two bytes long
        if element.len() < 2 {
            dangling = Some(element);
            continue;
        }

        let encoded = &element[..2];
        let tail = &element[2..];
        if b"\r\n" == encoded {
            // Soft line break with DOS ending, discard
            transformed.extend_from_slice(tail);
            continue;
        }

        if let Some(ch) = str::from_utf8(encoded)
            .ok()
            .and_then(|e| u8::from_str_radix(e, 16).ok())
        {
            transformed.push(ch);
            transformed.extend_from_slice(tail);
        } else {
            // Invalid encoding, just push the whole string verbatim
            transformed.push(b'=');
            transformed.extend_from_slice(element);
        }
    }

    if prefix.is_some() {
        // No `=` at all
        return Cow::Borrowed(s);
    }

    if let Some(dangling) = dangling {
        transformed.push(b'=');
        transformed.extend_from_slice(dangling);
    }

    Cow::Owned(transformed)
}

/// Encodes `s` as quoted-printable text with CRLF line endings.
///
/// Line breaks in the input (CRLF or bare LF) are hard line breaks in the
/// output. Encoded lines are kept within the 76 character limit with soft
/// line breaks.
pub fn qp_encode(s: &[u8]) -> String {
    const MAX_LINE: usize = 75;

    let mut out = String::with_capacity(s.len() * 3 / 2);
    for (ix, line) in s.split(|&b| b'\n' == b).enumerate() {
        if ix > 0 {
            out.push_str("\r\n");
        }

        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let mut line_len = 0;
        for (bix, &b) in line.iter().enumerate() {
            let last = bix + 1 == line.len();
            let literal = match b {
                b'=' => false,
                b' ' | b'\t' => !last,
                33..=126 => true,
                _ => false,
            };
            let width = if literal { 1 } else { 3 };

            if line_len + width > MAX_LINE {
                out.push_str("=\r\n");
                line_len = 0;
            }

            if literal {
                out.push(b as char);
            } else {
                let _ = write!(out, "={:02X}", b);
            }
            line_len += width;
        }
    }

    out
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    fn assert_qp(expected: &[u8], input: &[u8]) {
        assert_eq!(expected, &qp_decode(input)[..]);
    }

    #[test]
    fn test_qp_decode() {
        assert_qp(b"hello world", b"hello world");
        assert_qp(b"\xabfoo", b"=ABfoo");
        assert_qp(b"fo\xabo", b"fo=ABo");
        assert_qp(b"foo\xab", b"foo=AB");

        assert_qp(b"foo\xab\xcd", b"foo=AB=CD");
        assert_qp(b"foo\xabbar\xcd", b"foo=ABbar=CD");

        assert_qp(b"foo", b"foo=\n");
        assert_qp(b"foobar", b"foo=\nbar");
        assert_qp(b"foo", b"foo=\r\n");
        assert_qp(b"foobar", b"foo=\r\nbar");

        assert_qp(b"foo=()bar", b"foo=()bar");
        assert_qp(b"foo=\xabbar", b"foo==ABbar");
        assert_qp(b"foo=A\xabbar", b"foo=A=ABbar");
        assert_qp("foo=ゑbar".as_bytes(), "foo=ゑbar".as_bytes());
        assert_qp(b"foo=\x80\x80bar", b"foo=\x80\x80bar");

        assert_qp(b"foo=", b"foo=");
        assert_qp(b"foo=A", b"foo=A");
        assert_qp(b"foo=\r", b"foo=\r");
    }

    #[test]
    fn test_qp_encode() {
        assert_eq!("hello world", qp_encode(b"hello world"));
        assert_eq!("a=3Db", qp_encode(b"a=b"));
        assert_eq!(
            "Gr=C3=BC=C3=9Fe\r\nok",
            qp_encode("Grüße\nok".as_bytes())
        );
        assert_eq!("trailing=20\r\nnext", qp_encode(b"trailing \r\nnext"));
        assert_eq!("tab=09", qp_encode(b"tab\t"));

        let long = "x".repeat(100);
        let encoded = qp_encode(long.as_bytes());
        assert!(encoded.split("\r\n").all(|line| line.len() <= 76));
        assert_eq!(long.as_bytes(), &qp_decode(encoded.as_bytes())[..]);
    }

    proptest! {
        #[test]
        fn qp_decode_never_fails_for_str(s in ".*") {
            qp_decode(s.as_bytes());
        }

        #[test]
        fn qp_decode_never_fails_for_bytes(
            s in prop::collection::vec(prop::num::u8::ANY, 0..20)
        ) {
            qp_decode(&s);
        }

        #[test]
        fn qp_encode_is_reversible(s in "[^\r\n]*") {
            let encoded = qp_encode(s.as_bytes());
            prop_assert!(encoded.split("\r\n").all(|line| line.len() <= 76));
            prop_assert_eq!(s.as_bytes(), &qp_decode(encoded.as_bytes())[..]);
        }
    }
}
