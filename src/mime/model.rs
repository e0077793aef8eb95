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

use super::media_type::{self, MediaType};

/// An ordered multimap of header fields with case-insensitive names.
///
/// Names are kept in the case in which they were first seen so that the
/// header can be inspected in a natural form, but all lookups ignore ASCII
/// case.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Header {
    fields: Vec<(String, String)>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Returns the first value of the named field.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| &**v)
    }

    /// Returns every value of the named field, in order of appearance.
    pub fn get_all<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.fields
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| &**v)
    }

    /// The number of distinct field names.
    pub fn len(&self) -> usize {
        self.fields
            .iter()
            .enumerate()
            .filter(|&(ix, (name, _))| {
                !self.fields[..ix]
                    .iter()
                    .any(|(prev, _)| prev.eq_ignore_ascii_case(name))
            })
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.fields.iter().map(|(n, v)| (&**n, &**v))
    }
}

/// The body of a `MimeEntity`.
///
/// Leaves carry content; composites carry child entities. Nothing carries
/// both.
#[derive(Clone, Debug, PartialEq)]
pub enum Body<K> {
    Leaf {
        content: Vec<u8>,
        /// Whether the leaf was introduced as an attachment (see
        /// `Content-Disposition`). Attachments are never charset-decoded.
        is_attachment: bool,
    },
    Composite(Vec<MimeEntity<K>>),
}

/// One node of a parsed mail.
#[derive(Clone, Debug, PartialEq)]
pub struct MimeEntity<K> {
    pub header: Header,
    pub body: Body<K>,
    /// The key that made a signature over this entity, if and only if that
    /// signature was verified against the exact bytes it covers.
    pub signed_by: Option<K>,
}

impl<K> MimeEntity<K> {
    pub fn leaf(header: Header, content: Vec<u8>, is_attachment: bool) -> Self {
        MimeEntity {
            header,
            body: Body::Leaf {
                content,
                is_attachment,
            },
            signed_by: None,
        }
    }

    pub fn composite(header: Header, parts: Vec<MimeEntity<K>>) -> Self {
        MimeEntity {
            header,
            body: Body::Composite(parts),
            signed_by: None,
        }
    }

    /// The content of a leaf entity, or `None` for a composite.
    pub fn content(&self) -> Option<&[u8]> {
        match self.body {
            Body::Leaf { ref content, .. } => Some(content),
            Body::Composite(_) => None,
        }
    }

    /// The children of a composite entity. Leaves have no children.
    pub fn parts(&self) -> &[MimeEntity<K>] {
        match self.body {
            Body::Leaf { .. } => &[],
            Body::Composite(ref parts) => parts,
        }
    }

    pub fn is_attachment(&self) -> bool {
        matches!(
            self.body,
            Body::Leaf {
                is_attachment: true,
                ..
            }
        )
    }

    pub fn signed_by(&self) -> Option<&K> {
        self.signed_by.as_ref()
    }

    pub fn subject(&self) -> Option<&str> {
        self.header.get("Subject")
    }

    pub fn sender(&self) -> Option<&str> {
        self.header.get("From")
    }

    /// The resolved `Content-Type` of this entity, defaulting to
    /// `text/plain`.
    ///
    /// A malformed header is treated like an unknown type; the entity would
    /// not have parsed successfully in that case anyway.
    pub fn content_type(&self) -> MediaType {
        media_type::resolve(&self.header, "Content-Type", "text/plain")
            .unwrap_or_else(|_| MediaType::bare(""))
    }

    /// Finds the content of the first attachment of type `mime_type`,
    /// searching depth-first.
    pub fn find_attachment(&self, mime_type: &str) -> Option<&[u8]> {
        match self.body {
            Body::Leaf {
                ref content,
                is_attachment: true,
            } if self.content_type().value == mime_type => Some(content),
            Body::Leaf { .. } => None,
            Body::Composite(ref parts) => {
                parts.iter().find_map(|p| p.find_attachment(mime_type))
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    type Entity = MimeEntity<()>;

    fn header(fields: &[(&str, &str)]) -> Header {
        let mut h = Header::new();
        for &(n, v) in fields {
            h.add(n, v);
        }
        h
    }

    #[test]
    fn header_lookup_ignores_case() {
        let h = header(&[
            ("Content-Type", "text/plain"),
            ("X-Thing", "a"),
            ("x-thing", "b"),
        ]);
        assert_eq!(Some("text/plain"), h.get("content-type"));
        assert_eq!(vec!["a", "b"], h.get_all("X-THING").collect::<Vec<_>>());
        assert_eq!(None, h.get("Subject"));
        assert_eq!(2, h.len());
    }

    #[test]
    fn header_value_outlives_lookup_name() {
        let h = header(&[("Subject", "Hello")]);
        let value = {
            let name = "SUBJECT".to_owned();
            h.get(&name)
        };
        assert_eq!(Some("Hello"), value);
    }

    #[test]
    fn leaf_and_composite_are_exclusive() {
        let leaf = Entity::leaf(Header::new(), b"hello".to_vec(), false);
        assert_eq!(Some(&b"hello"[..]), leaf.content());
        assert!(leaf.parts().is_empty());

        let composite = Entity::composite(Header::new(), vec![leaf.clone()]);
        assert_eq!(None, composite.content());
        assert_eq!(1, composite.parts().len());
        assert!(!composite.is_attachment());
    }

    #[test]
    fn find_attachment_is_depth_first() {
        let keys = Entity::leaf(
            header(&[
                ("Content-Type", "application/pgp-keys"),
                ("Content-Disposition", "attachment"),
            ]),
            b"first".to_vec(),
            true,
        );
        let inline_keys = Entity::leaf(
            header(&[("Content-Type", "application/pgp-keys")]),
            b"not an attachment".to_vec(),
            false,
        );
        let later_keys = Entity::leaf(
            header(&[("Content-Type", "Application/PGP-Keys; name=k.asc")]),
            b"second".to_vec(),
            true,
        );
        let nested = Entity::composite(
            header(&[("Content-Type", "multipart/mixed; boundary=x")]),
            vec![inline_keys, keys],
        );
        let root =
            Entity::composite(Header::new(), vec![nested, later_keys]);

        assert_eq!(
            Some(&b"first"[..]),
            root.find_attachment("application/pgp-keys")
        );
        assert_eq!(None, root.find_attachment("image/png"));
    }
}
