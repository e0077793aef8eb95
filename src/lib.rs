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

//! Vouchmail validates that the holder of an OpenPGP key controls the email
//! addresses named on it, and certifies each address once proven.

#[cfg(test)]
macro_rules! assert_matches {
    ($expected:pat, $actual:expr) => {
        match $actual {
            $expected => (),
            unexpected => panic!(
                "Expected {} matches {}, got {:?}",
                stringify!($expected),
                stringify!($actual),
                unexpected
            ),
        }
    };
}

pub mod gpg;
pub mod mime;
pub mod storage;
pub mod support;
pub mod validator;

#[cfg(test)]
mod test_data;

pub use crate::gpg::{Gpg, PublicKey};
pub use crate::support::error::Error;
pub use crate::support::system_config::SystemConfig;
pub use crate::validator::{
    ConfirmationQueue, Nonce, OutgoingMail, Outbox, SpoolOutbox, Validator,
};
