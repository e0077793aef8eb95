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

//! RFC 2046 multipart framing.
//!
//! Only the framing is handled here: a multipart body is cut into the raw
//! bytes of its parts, each of which still carries its own header block.

use memchr::memmem;

use crate::support::error::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Delimiter {
    /// Offset of the leading `--`.
    start: usize,
    /// Offset of the first byte after the delimiter line.
    end: usize,
    close: bool,
}

/// Splits `body` into the raw content of its parts, in order.
///
/// The preamble before the first delimiter and the epilogue after the close
/// delimiter are discarded. The CRLF immediately preceding each delimiter
/// belongs to the delimiter, not the part before it.
///
/// Fails with `UnterminatedMultipart` if the body ends before the close
/// delimiter is seen.
pub fn split<'a>(
    body: &'a [u8],
    boundary: &str,
) -> Result<Vec<&'a [u8]>, Error> {
    let dash_boundary = format!("--{}", boundary);
    let dash_boundary = dash_boundary.as_bytes();

    let mut parts = Vec::new();
    let mut delimiter = find_delimiter(body, dash_boundary, 0)
        .ok_or(Error::UnterminatedMultipart)?;

    while !delimiter.close {
        let part_start = delimiter.end;
        let next = find_delimiter(body, dash_boundary, part_start)
            .ok_or(Error::UnterminatedMultipart)?;
        // An empty part shares its CRLF with the previous delimiter line.
        let part_end = next.start.saturating_sub(2).max(part_start);
        parts.push(&body[part_start..part_end]);
        delimiter = next;
    }

    Ok(parts)
}

/// Returns the raw content of the first part of `body`, framed exactly as
/// `split` frames it, without requiring the close delimiter.
///
/// Returns `None` if there is no first part or nothing delimits its end.
pub fn first_part<'a>(body: &'a [u8], boundary: &str) -> Option<&'a [u8]> {
    let dash_boundary = format!("--{}", boundary);
    let dash_boundary = dash_boundary.as_bytes();

    let opening = find_delimiter(body, dash_boundary, 0)?;
    if opening.close {
        return None;
    }

    let next = find_delimiter(body, dash_boundary, opening.end)?;
    Some(&body[opening.end..next.start.saturating_sub(2).max(opening.end)])
}

/// Finds the first delimiter line whose leading `--` is at or after `from`.
fn find_delimiter(
    body: &[u8],
    dash_boundary: &[u8],
    from: usize,
) -> Option<Delimiter> {
    memmem::find_iter(&body[from.min(body.len())..], dash_boundary)
        .map(|offset| from + offset)
        .find_map(|start| parse_delimiter(body, dash_boundary, start))
}

fn parse_delimiter(
    body: &[u8],
    dash_boundary: &[u8],
    start: usize,
) -> Option<Delimiter> {
    // Delimiters only occur at the start of a line
    if start != 0 && (start < 2 || &body[start - 2..start] != b"\r\n") {
        return None;
    }

    let rest = &body[start + dash_boundary.len()..];
    if rest.starts_with(b"--") {
        return Some(Delimiter {
            start,
            end: body.len(),
            close: true,
        });
    }

    // Transport padding
    let padding = rest
        .iter()
        .take_while(|&&b| b' ' == b || b'\t' == b)
        .count();
    let rest = &rest[padding..];
    let line_len = if rest.is_empty() {
        0
    } else if rest.starts_with(b"\r\n") {
        2
    } else {
        // Some other boundary that merely starts with this one
        return None;
    };

    Some(Delimiter {
        start,
        end: start + dash_boundary.len() + padding + line_len,
        close: false,
    })
}
