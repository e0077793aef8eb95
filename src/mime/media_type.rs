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

//! Parsing of `Content-Type` and `Content-Disposition` values.

use std::collections::BTreeMap;

use nom::{
    branch::alt,
    bytes::complete::{is_not, take, take_while, take_while1},
    character::complete::char,
    combinator::{all_consuming, map, opt, recognize},
    multi::{fold_many0, many0},
    sequence::{delimited, pair, preceded, separated_pair, tuple},
    IResult,
};

use super::model::Header;
use crate::support::error::Error;

/// A parsed media type or disposition, such as `text/plain; charset=utf-8`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MediaType {
    /// The lower-cased `type/subtype` (or bare disposition) token.
    pub value: String,
    /// Parameters, keyed by lower-cased name.
    pub params: BTreeMap<String, String>,
}

impl MediaType {
    /// A media type with the given value and no parameters.
    pub fn bare(value: &str) -> Self {
        MediaType {
            value: value.to_ascii_lowercase(),
            params: BTreeMap::new(),
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(&name.to_ascii_lowercase()).map(|v| &**v)
    }

    pub fn is_multipart(&self) -> bool {
        self.value.starts_with("multipart/")
    }

    pub fn is_text(&self) -> bool {
        self.value.starts_with("text/")
    }
}

/// Resolves the first value of the header `key` as a media type.
///
/// If the header is absent or blank, the result is `default` with no
/// parameters.
pub fn resolve(
    header: &Header,
    key: &str,
    default: &str,
) -> Result<MediaType, Error> {
    match header.get(key) {
        Some(raw) if !raw.trim().is_empty() => parse(raw),
        _ => Ok(MediaType::bare(default)),
    }
}

/// Parses a raw media type or disposition value.
pub fn parse(raw: &str) -> Result<MediaType, Error> {
    let (_, (value, raw_params)) = all_consuming(media_type)(raw)
        .map_err(|_| Error::MalformedMediaType(raw.to_owned()))?;

    let mut params = BTreeMap::new();
    for (name, param_value) in raw_params {
        if params
            .insert(name.to_ascii_lowercase(), param_value)
            .is_some()
        {
            return Err(Error::MalformedMediaType(raw.to_owned()));
        }
    }

    Ok(MediaType {
        value: value.to_ascii_lowercase(),
        params,
    })
}

// RFC 2045 5.1 "tspecials", plus space and controls.
fn is_token_char(ch: char) -> bool {
    ch.is_ascii_graphic() && !"()<>@,;:\\\"/[]?=".contains(ch)
}

fn ws(i: &str) -> IResult<&str, &str> {
    take_while(|ch: char| ch.is_ascii_whitespace())(i)
}

// RFC 2045 5.1 "token"
fn token(i: &str) -> IResult<&str, &str> {
    take_while1(is_token_char)(i)
}

// RFC 2045 5.1 "type "/" subtype". Dispositions have no subtype, so it is
// optional here.
fn value(i: &str) -> IResult<&str, &str> {
    recognize(pair(token, opt(pair(char('/'), token))))(i)
}

// RFC 822 3.3 "quoted-string", with backslash escapes.
fn quoted_string(i: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        fold_many0(
            alt((is_not("\\\""), preceded(char('\\'), take(1usize)))),
            String::new,
            |mut acc, s| {
                acc.push_str(s);
                acc
            },
        ),
        char('"'),
    )(i)
}

// Agents frequently put characters like `=` unquoted in boundaries, so
// anything up to the next delimiter is accepted as an unquoted value.
fn bare_value(i: &str) -> IResult<&str, String> {
    map(
        take_while1(|ch: char| {
            !ch.is_ascii_whitespace() && ch != ';' && ch != '"'
        }),
        str::to_owned,
    )(i)
}

fn semicolon(i: &str) -> IResult<&str, char> {
    delimited(ws, char(';'), ws)(i)
}

// RFC 2045 5.1 "parameter"
fn parameter(i: &str) -> IResult<&str, (&str, String)> {
    preceded(
        semicolon,
        separated_pair(
            token,
            delimited(ws, char('='), ws),
            alt((quoted_string, bare_value)),
        ),
    )(i)
}

fn media_type(i: &str) -> IResult<&str, (&str, Vec<(&str, String)>)> {
    map(
        tuple((ws, value, many0(parameter), opt(semicolon), ws)),
        |(_, value, params, _, _)| (value, params),
    )(i)
}
