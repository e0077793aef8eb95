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

//! The nonce challenge/response protocol.
//!
//! A user mails the service a request signed with their key, with the key
//! attached. For every identity on the key, the service stores a fresh nonce
//! and mails it, encrypted, to that identity. Whoever can read one of those
//! mails can then present its nonce, upon which the service certifies exactly
//! that one identity and mails the certified key back to it.
//!
//! Mail that is not validly signed is dropped without any reply, so the
//! service cannot be used to probe which keys or addresses it knows about.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::prelude::*;
use log::{error, info, warn};

use crate::gpg::{Gpg, PublicKey};
use crate::mime::{construct, Parser};
use crate::storage::{self, RequestInfo, Storage};
use crate::support::error::Error;
use crate::support::log_prefix::LogPrefix;
use crate::support::system_config::{NonceConfig, ParserConfig, SystemConfig};

mod confirm_queue;
mod nonce;
mod outbox;
mod outgoing;

pub use self::confirm_queue::{ConfirmationQueue, ConfirmationSubmitter};
pub use self::nonce::{Nonce, NONCE_LEN};
pub use self::outbox::{Outbox, SpoolOutbox};
pub use self::outgoing::{MailKind, OutgoingMail};

pub struct Validator<G: Gpg> {
    gpg: Arc<G>,
    store: Arc<dyn Storage<G::Key>>,
    parser_config: ParserConfig,
    nonce_config: NonceConfig,
}

impl<G: Gpg + 'static> Validator<G> {
    pub fn new(
        gpg: Arc<G>,
        store: Arc<dyn Storage<G::Key>>,
        config: &SystemConfig,
    ) -> Self {
        Validator {
            gpg,
            store,
            parser_config: config.parser,
            nonce_config: config.nonce.clone(),
        }
    }

    /// Creates a validator using the storage backend named in `config`.
    pub fn open(gpg: Arc<G>, config: &SystemConfig) -> Result<Self, Error> {
        let store = storage::open(&config.storage, Arc::clone(&gpg))?;
        Ok(Self::new(gpg, store, config))
    }

    /// Handles one inbound mail, returning the challenges to send.
    ///
    /// Nothing is returned for mail which cannot be parsed or does not carry
    /// a valid signature from an attached key. Storage failures only cost
    /// the challenge for the identity concerned.
    pub fn handle_mail(&self, raw: &[u8]) -> Vec<OutgoingMail<G::Key>> {
        let log_prefix = LogPrefix::new("mail".to_owned());
        let parser =
            Parser::new(&*self.gpg, self.parser_config, log_prefix.clone());

        let entity = match parser.parse_mail(raw) {
            Ok(entity) => entity,
            Err(e) => {
                warn!("{} Dropping unparseable mail: {}", log_prefix, e);
                return Vec::new();
            },
        };

        if let Some(sender) = entity.sender() {
            log_prefix.set_sender(sender.to_owned());
        }
        if let Some(message_id) = entity.header.get("Message-ID") {
            log_prefix.set_message_id(message_id.to_owned());
        }

        let key = match entity.signed_by {
            Some(key) => key,
            None => {
                info!("{} Ignoring mail without a valid signature", log_prefix);
                return Vec::new();
            },
        };

        info!(
            "{} Validation request for key {}",
            log_prefix,
            key.fingerprint()
        );

        let mut seen = HashSet::new();
        let mut challenges = Vec::new();
        for email in key.emails() {
            if !seen.insert(email.clone()) {
                continue;
            }

            match self.issue_challenge(&key, email.clone()) {
                Ok(challenge) => challenges.push(challenge),
                Err(e) => error!(
                    "{} Cannot issue challenge to {}: {}",
                    log_prefix, email, e
                ),
            }
        }

        challenges
    }

    fn issue_challenge(
        &self,
        key: &G::Key,
        email: String,
    ) -> Result<OutgoingMail<G::Key>, Error> {
        let nonce = Nonce::generate()?;
        self.store.set(
            &nonce,
            RequestInfo {
                key: key.clone(),
                email: email.clone(),
                timestamp: Utc::now(),
            },
        )?;

        Ok(OutgoingMail::challenge(
            &nonce,
            key.clone(),
            email,
            &self.nonce_config.confirmation_url,
        ))
    }

    /// Certifies the identity proven by `nonce` and returns the response
    /// carrying the certified key.
    ///
    /// The request is left in storage; call `complete_confirmation` once the
    /// response has been delivered.
    pub fn confirm_nonce(
        &self,
        nonce: &Nonce,
    ) -> Result<OutgoingMail<G::Key>, Error> {
        let log_prefix = LogPrefix::new("confirm".to_owned());
        log_prefix.set_nonce(nonce.to_hex());

        let request = match self.store.get(nonce)? {
            Some(request) => request,
            None => {
                warn!("{} Unknown nonce", log_prefix);
                return Err(Error::NonceNotFound(nonce.redacted()));
            },
        };
        log_prefix.set_sender(request.email.clone());

        if let Some(lifetime) = self.nonce_config.lifetime() {
            if Utc::now().signed_duration_since(request.timestamp) > lifetime {
                info!(
                    "{} Request from {} has expired",
                    log_prefix,
                    request.timestamp.to_rfc3339()
                );
                self.store.delete(nonce)?;
                return Err(Error::NonceExpired(nonce.redacted()));
            }
        }

        let signed_key = self.gpg.sign_user_id(&request.email, &request.key)?;
        info!(
            "{} Certified {} on key {}",
            log_prefix,
            request.email,
            request.key.fingerprint()
        );

        Ok(OutgoingMail::signed_key(
            request.key,
            request.email,
            signed_key,
        ))
    }

    /// Forgets the request behind `nonce` after its response went out.
    pub fn complete_confirmation(&self, nonce: &Nonce) -> Result<(), Error> {
        self.store.delete(nonce)
    }

    /// Renders `mail` and hands it to `outbox`.
    pub fn deliver(
        &self,
        mail: &OutgoingMail<G::Key>,
        outbox: &dyn Outbox,
    ) -> Result<(), Error> {
        let data = construct::render(mail, &*self.gpg, Utc::now())?;
        outbox.send(mail.kind, &mail.recipient_email, &data)
    }

    /// Handles one inbound mail and delivers every resulting challenge,
    /// returning how many were delivered.
    pub fn process_mail(&self, raw: &[u8], outbox: &dyn Outbox) -> usize {
        let mut delivered = 0;
        for mail in self.handle_mail(raw) {
            if let Err(e) = self.deliver(&mail, outbox) {
                let log_prefix = LogPrefix::new("mail".to_owned());
                log_prefix.set_sender(mail.recipient_email.clone());
                error!("{} Cannot deliver challenge: {}", log_prefix, e);
            } else {
                delivered += 1;
            }
        }
        delivered
    }

    /// Confirms `nonce`, delivers the certified key, and only then forgets
    /// the request.
    pub fn process_confirmation(
        &self,
        nonce: &Nonce,
        outbox: &dyn Outbox,
    ) -> Result<(), Error> {
        let mail = self.confirm_nonce(nonce)?;
        self.deliver(&mail, outbox)?;
        self.complete_confirmation(nonce)
    }

    /// Removes requests older than the configured nonce lifetime, returning
    /// how many were removed.
    pub fn sweep_expired(&self) -> Result<usize, Error> {
        let cutoff = match self
            .nonce_config
            .lifetime()
            .and_then(|lifetime| Utc::now().checked_sub_signed(lifetime))
        {
            Some(cutoff) => cutoff,
            None => return Ok(0),
        };

        let purged = self.store.purge_older_than(cutoff)?;
        if purged > 0 {
            info!(
                "{} Swept {} expired requests",
                LogPrefix::new("sweep".to_owned()),
                purged
            );
        }
        Ok(purged)
    }
}
