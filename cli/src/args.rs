/*
 * args.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of msgmta, a Microsoft Graph mail relay.
 *
 * msgmta is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * msgmta is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with msgmta.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Command line, shaped after sendmail(8) so msgmta can stand in for it.

use std::env;
use std::path::PathBuf;

use clap::Parser;
use msgmta_core::config::CONFIG_ENV;
use msgmta_core::relay::{RelayOptions, DEFAULT_SUBJECT};

pub const DEBUG_ENV: &str = "MSGMTA_DEBUG";
pub const DEBUG_PATH_ENV: &str = "MSGMTA_DEBUG_PATH";

/// Relay one message from standard input through Microsoft Graph.
#[derive(Parser, Debug)]
#[command(name = "msgmta", version, about)]
pub struct Args {
    /// Profile file (default ~/.config/msgmta.json)
    #[arg(short, long, env = CONFIG_ENV, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Sender profile to use
    #[arg(short, long, default_value = "default", value_name = "NAME")]
    pub profile: String,

    /// Log debug output to stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Keep the raw message, envelope and token under the debug path
    #[arg(short, long)]
    pub debug: bool,

    /// Directory for debug captures
    #[arg(short = 'D', long, env = DEBUG_PATH_ENV, default_value = ".", value_name = "DIR")]
    pub debug_path: PathBuf,

    /// Subject used when the message has none
    #[arg(short, long, default_value = DEFAULT_SUBJECT, value_name = "TEXT")]
    pub subject: String,

    /// Envelope sender; the profile's sender is always used
    #[arg(short, long, value_name = "ADDR")]
    pub from: Option<String>,

    /// Ignored (sendmail: dots do not end the message)
    #[arg(short = 'i', hide = true)]
    pub ignore_dots: bool,

    /// Ignored (sendmail: recipients from headers, which is always done)
    #[arg(short = 't', hide = true)]
    pub header_recipients: bool,

    /// Ignored (sendmail: sender full name)
    #[arg(short = 'F', value_name = "NAME", hide = true)]
    pub full_name: Option<String>,

    /// Ignored (sendmail: body type, 7BIT or 8BITMIME)
    #[arg(short = 'B', value_name = "TYPE", hide = true)]
    pub body_type: Option<String>,

    /// Ignored (sendmail: set option)
    #[arg(short = 'o', value_name = "OPT", hide = true)]
    pub options: Vec<String>,

    /// Additional To recipients
    #[arg(value_name = "RECIPIENTS")]
    pub recipients: Vec<String>,
}

impl Args {
    /// Capture is on with `-d` or a true-ish `MSGMTA_DEBUG`.
    pub fn debug_enabled(&self) -> bool {
        self.debug || env::var(DEBUG_ENV).map(|v| switch_on(&v)).unwrap_or(false)
    }

    pub fn relay_options(&self) -> RelayOptions {
        RelayOptions {
            subject: self.subject.clone(),
            recipients: self.recipients.clone(),
            debug_dir: self.debug_enabled().then(|| self.debug_path.clone()),
        }
    }
}

/// `1`, `t...` or `y...`, any case.
pub fn switch_on(value: &str) -> bool {
    matches!(
        value.trim_start().chars().next().map(|c| c.to_ascii_lowercase()),
        Some('1' | 't' | 'y')
    )
}
