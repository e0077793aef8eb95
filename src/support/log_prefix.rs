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
use std::mem;
use std::sync::{Arc, Mutex};

/// Tracks text that should be included in at the start of every log statement.
///
/// Clones of a `LogPrefix` share the same underlying data.
#[derive(Clone)]
pub struct LogPrefix {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    context: String,
    sender: Option<String>,
    message_id: Option<String>,
    nonce: Option<String>,
}

impl LogPrefix {
    pub fn new(context: String) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                context,
                sender: None,
                message_id: None,
                nonce: None,
            })),
        }
    }

    pub fn set_sender(&self, sender: String) {
        self.inner.lock().unwrap().sender = Some(sanitise(sender));
    }

    pub fn set_message_id(&self, message_id: String) {
        self.inner.lock().unwrap().message_id = Some(sanitise(message_id));
    }

    pub fn set_nonce(&self, nonce: String) {
        // The full nonce is a bearer credential; only a prefix is logged.
        let mut nonce = sanitise(nonce);
        if let Some((truncate_len, _)) = nonce.char_indices().nth(8) {
            nonce.truncate(truncate_len);
        }
        self.inner.lock().unwrap().nonce = Some(nonce);
    }
}

impl fmt::Display for LogPrefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let inner = self.inner.lock().unwrap();
        write!(f, "{}", inner.context)?;
        if inner.sender.is_some()
            || inner.message_id.is_some()
            || inner.nonce.is_some()
        {
            write!(f, "[")?;
            let mut first = true;
            if let Some(ref sender) = inner.sender {
                write!(f, "{sender}")?;
                first = false;
            }

            if let Some(ref message_id) = inner.message_id {
                if !mem::take(&mut first) {
                    write!(f, " ")?;
                }
                write!(f, "id={message_id}")?;
            }

            if let Some(ref nonce) = inner.nonce {
                if !mem::take(&mut first) {
                    write!(f, " ")?;
                }
                write!(f, "nonce={nonce}")?;
            }
            write!(f, "]")?;
        }

        Ok(())
    }
}

fn sanitise(mut s: String) -> String {
    s.retain(|c| !c.is_control());
    if let Some((truncate_len, _)) = s.char_indices().nth(64) {
        s.truncate(truncate_len);
    }

    s
}
