/*
 * main.rs
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

//! msgmta: sendmail-compatible relay that hands one message to Microsoft Graph.
//!
//! Exit status follows sysexits(3): 75 means try again later, any other
//! non-zero status is permanent.

mod args;

use std::process::ExitCode;

use clap::Parser;
use tokio::io::AsyncReadExt;
use tracing::{debug, error, Level};

use msgmta_core::config::{load_sender_identity, resolve_config_path};
use msgmta_core::{ClientCredentialsAuthenticator, GraphMailer, MtaError};

use args::Args;

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if verbose { Level::DEBUG } else { Level::WARN })
        .with_target(false)
        .init();
}

fn run(args: &Args) -> Result<(), MtaError> {
    let path = resolve_config_path(args.config.as_deref())?;
    let identity = load_sender_identity(&path, &args.profile)?;
    if let Some(from) = args.from.as_deref() {
        if !from.eq_ignore_ascii_case(&identity.from_address) {
            debug!(
                "ignoring envelope sender {}; sending as {}",
                from, identity.from_address
            );
        }
    }
    debug!(
        "ignored sendmail flags: -i {}, -t {}, -F {:?}, -B {:?}, -o {:?}",
        args.ignore_dots, args.header_recipients, args.full_name, args.body_type, args.options
    );
    let options = args.relay_options();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let mut raw = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut raw)
            .await
            .map_err(MtaError::Input)?;
        debug!("read {} bytes from stdin", raw.len());

        let tokens = ClientCredentialsAuthenticator::new(&identity);
        let mailer = GraphMailer::for_identity(&identity);
        msgmta_core::relay(&raw, &options, &tokens, &mailer).await?;
        Ok::<(), MtaError>(())
    })
}
