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

//! Logging setup.
//!
//! Everything in Vouchmail logs through the `log` facade. This module wires
//! that facade to `log4rs` according to the `[logging]` configuration
//! section.

use std::str::FromStr;

use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

use crate::support::error::Error;
use crate::support::system_config::LoggingConfig;

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}][{t}] {m}{n}";

/// Installs the global logger described by `config`.
///
/// This can only succeed once per process.
pub fn init(config: &LoggingConfig) -> Result<(), Error> {
    let config = build_config(config)?;
    log4rs::init_config(config).map_err(|e| Error::Logging(e.to_string()))?;
    Ok(())
}

/// Installs a debug-level console logger for unit tests. Later calls do
/// nothing.
#[cfg(test)]
pub fn init_test_log() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let config = build_config(&LoggingConfig {
            level: "debug".to_owned(),
            file: None,
        })
        .unwrap();
        // Another test harness may already own the global logger
        let _ = log4rs::init_config(config);
    });
}

fn build_config(config: &LoggingConfig) -> Result<Config, Error> {
    let level = LevelFilter::from_str(&config.level).map_err(|_| {
        Error::Logging(format!("unknown log level {:?}", config.level))
    })?;

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build();

    let mut builder = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)));
    let mut root = Root::builder().appender("stderr");

    if let Some(ref path) = config.file {
        let file = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(PATTERN)))
            .append(true)
            .build(path)?;
        builder =
            builder.appender(Appender::builder().build("file", Box::new(file)));
        root = root.appender("file");
    }

    builder
        .build(root.build(level))
        .map_err(|e| Error::Logging(e.to_string()))
}
