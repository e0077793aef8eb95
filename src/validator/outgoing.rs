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

use std::fmt;

use crate::gpg::PublicKey;

use super::nonce::Nonce;

/// What an outgoing mail is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MailKind {
    /// Carries a nonce to one identity of a key.
    Challenge,
    /// Carries the countersigned key after a confirmation.
    SignedKey,
}

impl fmt::Display for MailKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            MailKind::Challenge => write!(f, "nonce"),
            MailKind::SignedKey => write!(f, "signature"),
        }
    }
}

/// A mail the service wants to send, before encryption and rendering.
#[derive(Clone, Debug, PartialEq)]
pub struct OutgoingMail<K> {
    pub kind: MailKind,
    /// The plain text body.
    pub message: String,
    pub recipient_email: String,
    /// The key the rendered mail is encrypted to.
    pub recipient_key: K,
    /// An armoured public key to attach, if any.
    pub attachment: Option<Vec<u8>>,
}

impl<K: PublicKey> OutgoingMail<K> {
    /// Builds the challenge mail sent to `email` after a signed request for
    /// `key`.
    pub fn challenge(
        nonce: &Nonce,
        key: K,
        email: String,
        confirmation_url: &str,
    ) -> Self {
        let message = format!(
            "Hello,\n\
             \n\
             a request was made to validate the OpenPGP key\n\
             \n\
             \x20 {fingerprint}\n\
             \n\
             for the address {email}.\n\
             \n\
             If you made this request, confirm it by visiting\n\
             \n\
             \x20 {url}{nonce}\n\
             \n\
             or by submitting the confirmation code\n\
             \n\
             \x20 {nonce}\n\
             \n\
             If you did not make this request, you can ignore this mail.\n",
            fingerprint = key.fingerprint(),
            email = email,
            url = confirmation_url,
            nonce = nonce.to_hex(),
        );

        OutgoingMail {
            kind: MailKind::Challenge,
            message,
            recipient_email: email,
            recipient_key: key,
            attachment: None,
        }
    }

    /// Builds the response carrying `signed_key`, the countersigned form of
    /// `key`.
    pub fn signed_key(key: K, email: String, signed_key: Vec<u8>) -> Self {
        OutgoingMail {
            kind: MailKind::SignedKey,
            message: "Here is your signed key!\n".to_owned(),
            recipient_email: email,
            recipient_key: key,
            attachment: Some(signed_key),
        }
    }
}
