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

//! Fixtures shared by the unit tests.
//!
//! `FakeGpg` stands in for a real OpenPGP implementation. Its "cryptography"
//! is plain text so that test mails can be built by hand and failures are
//! easy to read:
//!
//! - A key is `FAKE KEY <fingerprint> <email>...`.
//! - A detached signature is `<fingerprint>:<hex of signed bytes>`.
//! - A message is `FAKE MESSAGE <recipient> <signer or -> <hex plaintext>`.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::gpg::{self, Gpg, PublicKey};
use crate::storage::{memory::MemoryStore, RequestInfo, Storage};
use crate::support::error::Error;
use crate::validator::{MailKind, Nonce, Outbox};

pub const SERVER_FINGERPRINT: &str = "5E4F5E4F5E4F5E4F";
pub const SERVER_IDENTITY: &str = "validator@vouch.example";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FakeKey {
    fingerprint: String,
    emails: Vec<String>,
}

impl FakeKey {
    pub fn new(fingerprint: &str, emails: &[&str]) -> Self {
        FakeKey {
            fingerprint: fingerprint.to_owned(),
            emails: emails.iter().map(|&e| e.to_owned()).collect(),
        }
    }

    pub fn armoured(&self) -> String {
        format!("FAKE KEY {} {}", self.fingerprint, self.emails.join(" "))
    }

    /// The detached signature this key makes over `message`.
    pub fn sign(&self, message: &[u8]) -> String {
        format!("{}:{}", self.fingerprint, hex::encode(message))
    }
}

impl PublicKey for FakeKey {
    fn fingerprint(&self) -> String {
        self.fingerprint.clone()
    }

    fn key_id(&self) -> String {
        let start = self.fingerprint.len().saturating_sub(16);
        self.fingerprint[start..].to_owned()
    }

    fn emails(&self) -> Vec<String> {
        self.emails.clone()
    }
}

/// Encrypts `plaintext` for the fake server, optionally signed by `signer`.
pub fn encrypt_to_server(plaintext: &[u8], signer: Option<&FakeKey>) -> String {
    format!(
        "FAKE MESSAGE {} {} {}",
        SERVER_FINGERPRINT,
        signer.map_or("-", |k| k.fingerprint.as_str()),
        hex::encode(plaintext)
    )
}

struct FakeMessage {
    recipient: String,
    signer: Option<String>,
    plaintext: Vec<u8>,
}

fn parse_message(data: &[u8]) -> Option<FakeMessage> {
    let text = std::str::from_utf8(data).ok()?;
    let mut tokens = text.split_whitespace();
    if Some("FAKE") != tokens.next() || Some("MESSAGE") != tokens.next() {
        return None;
    }

    let recipient = tokens.next()?.to_owned();
    let signer = match tokens.next()? {
        "-" => None,
        fp => Some(fp.to_owned()),
    };
    let plaintext = hex::decode(tokens.next().unwrap_or("")).ok()?;
    Some(FakeMessage {
        recipient,
        signer,
        plaintext,
    })
}

#[derive(Default)]
pub struct FakeGpg {
    signed_user_ids: Mutex<Vec<(String, String)>>,
}

impl FakeGpg {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(email, fingerprint)` passed to `sign_user_id`, in order.
    pub fn signed_user_ids(&self) -> Vec<(String, String)> {
        self.signed_user_ids.lock().unwrap().clone()
    }

    /// Decrypts a message the fake server encrypted to a user.
    pub fn decrypt_outgoing(data: &[u8]) -> (String, Vec<u8>) {
        let message = parse_message(data).expect("not a fake message");
        assert_eq!(Some(SERVER_FINGERPRINT), message.signer.as_deref());
        (message.recipient, message.plaintext)
    }
}

/// Finds the ciphertext in a mail rendered for a user and decrypts it.
pub fn open_rendered(data: &[u8]) -> (String, Vec<u8>) {
    let text = std::str::from_utf8(data).expect("rendered mail not UTF-8");
    let ciphertext = text
        .lines()
        .find(|line| line.starts_with("FAKE MESSAGE "))
        .expect("no ciphertext in rendered mail");
    FakeGpg::decrypt_outgoing(ciphertext.as_bytes())
}

impl Gpg for FakeGpg {
    type Key = FakeKey;

    fn read_key(&self, data: &[u8]) -> Result<FakeKey, gpg::Error> {
        let malformed =
            || gpg::Error::MalformedKey(String::from_utf8_lossy(data).into());
        let text = std::str::from_utf8(data).map_err(|_| malformed())?;
        let mut tokens = text.split_whitespace();
        if Some("FAKE") != tokens.next() || Some("KEY") != tokens.next() {
            return Err(malformed());
        }

        let fingerprint = tokens.next().ok_or_else(malformed)?;
        Ok(FakeKey::new(fingerprint, &tokens.collect::<Vec<_>>()))
    }

    fn export_key(&self, key: &FakeKey) -> Result<Vec<u8>, gpg::Error> {
        Ok(key.armoured().into_bytes())
    }

    fn check_message_signature(
        &self,
        message: &[u8],
        signature: &[u8],
        signer: &FakeKey,
    ) -> Result<(), gpg::Error> {
        let signature = String::from_utf8_lossy(signature);
        let (fingerprint, _) = signature
            .trim()
            .split_once(':')
            .ok_or_else(|| gpg::Error::BadSignature("garbage".to_owned()))?;
        if fingerprint != signer.fingerprint {
            return Err(gpg::Error::WrongSigner {
                expected: signer.fingerprint.clone(),
                actual: fingerprint.to_owned(),
            });
        }

        if signature.trim() != signer.sign(message) {
            return Err(gpg::Error::BadSignature(
                "content mismatch".to_owned(),
            ));
        }

        Ok(())
    }

    fn encrypt_message(
        &self,
        plaintext: &[u8],
        recipient: &FakeKey,
    ) -> Result<Vec<u8>, gpg::Error> {
        Ok(format!(
            "FAKE MESSAGE {} {} {}",
            recipient.fingerprint,
            SERVER_FINGERPRINT,
            hex::encode(plaintext)
        )
        .into_bytes())
    }

    fn decrypt_message(
        &self,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, gpg::Error> {
        match parse_message(ciphertext) {
            Some(message) if SERVER_FINGERPRINT == message.recipient => {
                Ok(message.plaintext)
            },
            _ => Err(gpg::Error::NotEncrypted),
        }
    }

    fn decrypt_signed_message(
        &self,
        ciphertext: &[u8],
        signer: &FakeKey,
    ) -> Result<Vec<u8>, gpg::Error> {
        let message = match parse_message(ciphertext) {
            Some(message) if SERVER_FINGERPRINT == message.recipient => message,
            _ => return Err(gpg::Error::NotEncrypted),
        };

        match message.signer {
            None => Err(gpg::Error::NotSigned),
            Some(fp) if fp != signer.fingerprint => {
                Err(gpg::Error::WrongSigner {
                    expected: signer.fingerprint.clone(),
                    actual: fp,
                })
            },
            Some(_) => Ok(message.plaintext),
        }
    }

    fn sign_user_id(
        &self,
        email: &str,
        key: &FakeKey,
    ) -> Result<Vec<u8>, gpg::Error> {
        if !key.emails.iter().any(|e| e == email) {
            return Err(gpg::Error::NoSuchIdentity(email.to_owned()));
        }

        self.signed_user_ids
            .lock()
            .unwrap()
            .push((email.to_owned(), key.fingerprint.clone()));
        Ok(format!(
            "FAKE CERTIFIED {} {} BY {}",
            key.fingerprint, email, SERVER_FINGERPRINT
        )
        .into_bytes())
    }

    fn server_identity(&self) -> String {
        SERVER_IDENTITY.to_owned()
    }
}

/// Builds the body of a multipart entity.
pub struct MultipartBuilder {
    boundary: String,
    buffer: String,
}

impl MultipartBuilder {
    pub fn new(boundary: &str) -> Self {
        MultipartBuilder {
            boundary: boundary.to_owned(),
            buffer: String::new(),
        }
    }

    pub fn part(self, content_type: &str, text: &str) -> Self {
        self.part_with_header(&[("Content-Type", content_type)], text)
    }

    pub fn part_with_header(
        mut self,
        header: &[(&str, &str)],
        text: &str,
    ) -> Self {
        self.buffer.push_str(&format!("--{}\r\n", self.boundary));
        for &(name, value) in header {
            self.buffer.push_str(&format!("{}: {}\r\n", name, value));
        }
        self.buffer.push_str("\r\n");
        self.buffer.push_str(text);
        self.buffer.push_str("\r\n");
        self
    }

    pub fn build(mut self) -> String {
        self.buffer.push_str(&format!("--{}--\r\n", self.boundary));
        self.buffer
    }
}

/// A `multipart/mixed` entity holding `text` and `key` as an attachment, the
/// usual shape of a validation request.
pub fn key_mail(key: &FakeKey, text: &str) -> String {
    let body = MultipartBuilder::new("mixed")
        .part("text/plain; charset=utf-8", text)
        .part_with_header(
            &[
                ("Content-Type", "application/pgp-keys; name=\"key.asc\""),
                ("Content-Disposition", "attachment; filename=\"key.asc\""),
            ],
            &key.armoured(),
        )
        .build();
    format!(
        "Content-Type: multipart/mixed; boundary=\"mixed\"\r\n\r\n{}",
        body
    )
}

/// Builds a complete `multipart/signed` mail in the shape mail user agents
/// produce for a validation request.
pub struct SignedMailBuilder {
    attached: Option<FakeKey>,
    from: String,
    signer: FakeKey,
    text: String,
    micalg: bool,
    signature_type: String,
}

impl SignedMailBuilder {
    pub fn new(key: &FakeKey) -> Self {
        SignedMailBuilder {
            attached: Some(key.clone()),
            from: key.emails().first().cloned().unwrap_or_default(),
            signer: key.clone(),
            text: "Please validate my key.".to_owned(),
            micalg: true,
            signature_type: "application/pgp-signature".to_owned(),
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_owned();
        self
    }

    pub fn signed_by(mut self, signer: &FakeKey) -> Self {
        self.signer = signer.clone();
        self
    }

    pub fn without_key(mut self) -> Self {
        self.attached = None;
        self
    }

    pub fn without_micalg(mut self) -> Self {
        self.micalg = false;
        self
    }

    pub fn signature_type(mut self, content_type: &str) -> Self {
        self.signature_type = content_type.to_owned();
        self
    }

    pub fn build(self) -> String {
        let signed_entity = match self.attached {
            Some(ref key) => key_mail(key, &self.text),
            None => format!(
                "Content-Type: text/plain; charset=utf-8\r\n\r\n{}",
                self.text
            ),
        };

        // The signature covers the first part with its trailing line endings
        // collapsed into a single CRLF.
        let signed_part =
            format!("{}\r\n", signed_entity.trim_end_matches("\r\n"));
        let signature = self.signer.sign(signed_part.as_bytes());
        let signature_type =
            format!("{}; name=\"signature.asc\"", self.signature_type);

        let body = format!(
            "--signed\r\n{}\r\n{}",
            signed_entity,
            MultipartBuilder::new("signed")
                .part_with_header(
                    &[
                        ("Content-Type", signature_type.as_str()),
                        (
                            "Content-Disposition",
                            "attachment; filename=\"signature.asc\"",
                        ),
                    ],
                    &signature,
                )
                .build()
        );

        let micalg = if self.micalg { " micalg=pgp-sha256;" } else { "" };
        format!(
            "From: {}\r\n\
             To: {}\r\n\
             Subject: Key validation\r\n\
             Message-ID: <request@irk.example>\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: multipart/signed;{} \
             protocol=\"application/pgp-signature\"; boundary=\"signed\"\r\n\
             \r\n\
             This is an OpenPGP/MIME signed message (RFC 4880 and 3156)\r\n\
             {}",
            self.from, SERVER_IDENTITY, micalg, body
        )
    }
}

/// Builds a complete RFC 3156 `multipart/encrypted` mail addressed to the
/// fake server.
pub struct EncryptedMailBuilder {
    plaintext: String,
    signer: Option<FakeKey>,
    protocol: String,
    version: String,
}

impl EncryptedMailBuilder {
    pub fn new(plaintext: &str) -> Self {
        EncryptedMailBuilder {
            plaintext: plaintext.to_owned(),
            signer: None,
            protocol: "application/pgp-encrypted".to_owned(),
            version: "Version: 1".to_owned(),
        }
    }

    pub fn signed_by(mut self, signer: &FakeKey) -> Self {
        self.signer = Some(signer.clone());
        self
    }

    pub fn protocol(mut self, protocol: &str) -> Self {
        self.protocol = protocol.to_owned();
        self
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_owned();
        self
    }

    pub fn build(self) -> String {
        let body = MultipartBuilder::new("enc")
            .part_with_header(
                &[
                    ("Content-Type", "application/pgp-encrypted"),
                    ("Content-Description", "PGP/MIME version identification"),
                ],
                &self.version,
            )
            .part_with_header(
                &[
                    (
                        "Content-Type",
                        "application/octet-stream; name=\"encrypted.asc\"",
                    ),
                    ("Content-Description", "OpenPGP encrypted message"),
                    (
                        "Content-Disposition",
                        "inline; filename=\"encrypted.asc\"",
                    ),
                ],
                &encrypt_to_server(
                    self.plaintext.as_bytes(),
                    self.signer.as_ref(),
                ),
            )
            .build();

        format!(
            "From: zim@irk.example\r\n\
             To: {}\r\n\
             Subject: ...\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: multipart/encrypted; \
             protocol=\"{}\"; boundary=\"enc\"\r\n\
             \r\n\
             This is an OpenPGP/MIME encrypted message (RFC 4880 and 3156)\r\n\
             {}",
            SERVER_IDENTITY, self.protocol, body
        )
    }
}

/// An `Outbox` which remembers everything handed to it.
#[derive(Default)]
pub struct RecordingOutbox {
    sent: Mutex<Vec<(MailKind, String, Vec<u8>)>>,
    fail: bool,
}

impl RecordingOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// An outbox that rejects everything.
    pub fn failing() -> Self {
        RecordingOutbox {
            sent: Mutex::default(),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<(MailKind, String, Vec<u8>)> {
        self.sent.lock().unwrap().clone()
    }
}

impl Outbox for RecordingOutbox {
    fn send(
        &self,
        kind: MailKind,
        recipient: &str,
        message: &[u8],
    ) -> Result<(), Error> {
        if self.fail {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "outbox unavailable",
            )));
        }

        self.sent
            .lock()
            .unwrap()
            .push((kind, recipient.to_owned(), message.to_vec()));
        Ok(())
    }
}

/// A `Storage` which fails every write for the listed email addresses and
/// otherwise behaves like `MemoryStore`.
pub struct FlakyStore {
    inner: MemoryStore<FakeKey>,
    failing_emails: Vec<String>,
    pub writes: Mutex<HashMap<String, usize>>,
}

impl FlakyStore {
    pub fn new(failing_emails: &[&str]) -> Self {
        FlakyStore {
            inner: MemoryStore::new(),
            failing_emails: failing_emails
                .iter()
                .map(|&e| e.to_owned())
                .collect(),
            writes: Mutex::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl Storage<FakeKey> for FlakyStore {
    fn get(
        &self,
        nonce: &Nonce,
    ) -> Result<Option<RequestInfo<FakeKey>>, Error> {
        self.inner.get(nonce)
    }

    fn set(
        &self,
        nonce: &Nonce,
        info: RequestInfo<FakeKey>,
    ) -> Result<(), Error> {
        *self
            .writes
            .lock()
            .unwrap()
            .entry(info.email.clone())
            .or_default() += 1;
        if self.failing_emails.contains(&info.email) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.inner.set(nonce, info)
    }

    fn delete(&self, nonce: &Nonce) -> Result<(), Error> {
        self.inner.delete(nonce)
    }

    fn purge_older_than(
        &self,
        cutoff: chrono::DateTime<chrono::Utc>,
    ) -> Result<usize, Error> {
        self.inner.purge_older_than(cutoff)
    }
}
