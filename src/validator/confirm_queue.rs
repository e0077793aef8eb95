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

use std::sync::Arc;
use std::thread;

use crossbeam::channel::{self, Sender};
use log::{error, info, warn};

use super::{Nonce, Outbox, Validator};
use crate::gpg::Gpg;
use crate::support::error::Error;
use crate::support::log_prefix::LogPrefix;

/// Serialises confirmations onto a single worker thread.
///
/// Any number of producers may submit nonces. The worker confirms each one,
/// delivers the certified key, and removes the request, strictly one nonce
/// at a time.
///
/// Shutting down or dropping the queue joins the worker, which only exits
/// once every `ConfirmationSubmitter` is gone. Either one blocks for as long
/// as a submitter is alive.
pub struct ConfirmationQueue {
    sender: Option<Sender<Nonce>>,
    worker: Option<thread::JoinHandle<()>>,
}

/// A cloneable handle for submitting nonces to a `ConfirmationQueue`.
#[derive(Clone, Debug)]
pub struct ConfirmationSubmitter {
    sender: Sender<Nonce>,
}

impl ConfirmationQueue {
    /// Starts the worker thread.
    pub fn start<G: Gpg + 'static>(
        validator: Arc<Validator<G>>,
        outbox: Arc<dyn Outbox>,
    ) -> Result<Self, Error> {
        let (sender, receiver) = channel::unbounded::<Nonce>();
        let worker = thread::Builder::new()
            .name("confirm".to_owned())
            .spawn(move || {
                for nonce in receiver {
                    let log_prefix = LogPrefix::new("confirm".to_owned());
                    log_prefix.set_nonce(nonce.to_hex());
                    match validator.process_confirmation(&nonce, &*outbox) {
                        Ok(()) => info!("{} Completed", log_prefix),
                        Err(e) => warn!("{} Failed: {}", log_prefix, e),
                    }
                }
            })?;

        Ok(ConfirmationQueue {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    /// Queues `nonce` for confirmation.
    pub fn submit(&self, nonce: Nonce) -> Result<(), Error> {
        self.sender
            .as_ref()
            .ok_or(Error::QueueClosed)?
            .send(nonce)
            .map_err(|_| Error::QueueClosed)
    }

    pub fn submitter(&self) -> Result<ConfirmationSubmitter, Error> {
        Ok(ConfirmationSubmitter {
            sender: self.sender.clone().ok_or(Error::QueueClosed)?,
        })
    }

    /// Stops accepting nonces from this handle and waits for the worker to
    /// drain everything already queued.
    ///
    /// Submitters handed out earlier keep the worker alive until they are
    /// dropped too.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.sender = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!(
                    "{} Worker thread panicked",
                    LogPrefix::new("confirm".to_owned())
                );
            }
        }
    }
}

impl Drop for ConfirmationQueue {
    /// Blocks until the backlog is drained and every outstanding
    /// `ConfirmationSubmitter` has been dropped.
    fn drop(&mut self) {
        self.stop();
    }
}

impl ConfirmationSubmitter {
    pub fn submit(&self, nonce: Nonce) -> Result<(), Error> {
        self.sender.send(nonce).map_err(|_| Error::QueueClosed)
    }
}
