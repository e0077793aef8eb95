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

pub mod construct;
pub mod content_encoding;
pub mod encrypted;
pub mod header;
pub mod media_type;
pub mod model;
pub mod multipart;
pub mod parser;
pub mod quoted_printable;
pub mod signed;

pub use self::model::{Body, Header, MimeEntity};
pub use self::parser::{parse_mail, Parser};
