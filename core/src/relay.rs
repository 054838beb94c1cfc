/*
 * relay.rs
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

//! One relay invocation: parse, merge command-line overrides, check
//! recipients, authenticate, deliver.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::debug_capture::DebugCapture;
use crate::envelope::{format_recipients, parse_message, Envelope};
use crate::error::MtaError;
use crate::graph::MailSender;
use crate::oauth::TokenSource;

pub const DEFAULT_SUBJECT: &str = "no subject";

/// Overrides and switches supplied on the command line.
#[derive(Debug, Clone)]
pub struct RelayOptions {
    /// Used when the message has no subject of its own.
    pub subject: String,
    /// Appended to the message's To recipients.
    pub recipients: Vec<String>,
    /// Capture directory, when debug capture is on.
    pub debug_dir: Option<PathBuf>,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            subject: DEFAULT_SUBJECT.to_string(),
            recipients: Vec::new(),
            debug_dir: None,
        }
    }
}

/// Apply the overrides: extra recipients go after the parsed ones, and the
/// parsed subject wins unless it is empty.
pub fn merge(mut envelope: Envelope, options: &RelayOptions) -> Envelope {
    envelope.to.extend(format_recipients(&options.recipients));
    if envelope.subject.is_empty() {
        envelope.subject = options.subject.clone();
    }
    envelope
}

/// Deliver `raw` through `mailer` with a token from `tokens`. Returns the
/// envelope that was sent.
///
/// Nothing goes over the network unless the message parses and names at least
/// one To recipient; the mailer is only called once a token is in hand.
pub async fn relay(
    raw: &[u8],
    options: &RelayOptions,
    tokens: &dyn TokenSource,
    mailer: &dyn MailSender,
) -> Result<Envelope, MtaError> {
    let capture = options.debug_dir.as_deref().and_then(|dir| {
        DebugCapture::start(dir, raw)
            .map_err(|e| warn!("debug capture in {} disabled: {}", dir.display(), e))
            .ok()
    });

    let envelope = merge(parse_message(raw)?, options);
    debug!(
        "subject {:?}, {} to, {} cc, {} bytes of {}",
        envelope.subject,
        envelope.to.len(),
        envelope.cc.len(),
        envelope.content.len(),
        envelope.content_type
    );
    if let Some(capture) = &capture {
        if let Err(e) = capture.write_envelope(&envelope) {
            warn!("cannot capture envelope: {}", e);
        }
    }
    if envelope.to.is_empty() {
        return Err(MtaError::NoRecipients);
    }

    let token = tokens.access_token().await?;
    if let Some(capture) = &capture {
        if let Err(e) = capture.write_token(&token) {
            warn!("cannot capture token: {}", e);
        }
    }

    mailer.send(&token, &envelope).await?;
    info!("relayed {:?} to {} recipient(s)", envelope.subject, envelope.to.len() + envelope.cc.len());
    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Recipient;
    use crate::oauth::AccessToken;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeTokens {
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeTokens {
        fn ok() -> Self {
            Self { calls: AtomicUsize::new(0), fail: false }
        }

        fn failing() -> Self {
            Self { calls: AtomicUsize::new(0), fail: true }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenSource for FakeTokens {
        async fn access_token(&self) -> Result<AccessToken, MtaError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(MtaError::Authentication {
                    detail: r#"{"error":"invalid_client"}"#.into(),
                })
            } else {
                Ok(AccessToken::new("tok-123", Some(3600)))
            }
        }
    }

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<(String, Envelope)>>,
        reject_with: Option<u16>,
    }

    impl RecordingMailer {
        fn sent(&self) -> Vec<(String, Envelope)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MailSender for RecordingMailer {
        async fn send(&self, token: &AccessToken, envelope: &Envelope) -> Result<(), MtaError> {
            self.sent
                .lock()
                .unwrap()
                .push((token.secret().to_string(), envelope.clone()));
            match self.reject_with {
                Some(status) => Err(MtaError::Delivery {
                    status,
                    body: "{}".into(),
                }),
                None => Ok(()),
            }
        }
    }

    fn addresses(list: &[Recipient]) -> Vec<&str> {
        list.iter().map(|r| r.address()).collect()
    }

    #[tokio::test]
    async fn plain_message_is_delivered_once() {
        let tokens = FakeTokens::ok();
        let mailer = RecordingMailer::default();
        let sent = relay(b"To: a@x.com\nSubject: Hi\n\nHello", &RelayOptions::default(), &tokens, &mailer)
            .await
            .unwrap();
        assert_eq!(sent.subject, "Hi");
        assert_eq!(addresses(&sent.to), ["a@x.com"]);
        assert_eq!(sent.content, "Hello");
        assert_eq!(tokens.calls(), 1);
        let delivered = mailer.sent();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].0, "tok-123");
        assert_eq!(delivered[0].1, sent);
    }

    #[tokio::test]
    async fn command_line_recipients_and_subject_fill_in() {
        let tokens = FakeTokens::ok();
        let mailer = RecordingMailer::default();
        let options = RelayOptions {
            subject: "cron output".into(),
            recipients: vec!["ops@x.com".into(), " b@x.com ".into()],
            debug_dir: None,
        };
        let sent = relay(b"To: a@x.com\n\nbody", &options, &tokens, &mailer).await.unwrap();
        assert_eq!(sent.subject, "cron output");
        assert_eq!(addresses(&sent.to), ["a@x.com", "ops@x.com", "b@x.com"]);

        let sent = relay(b"Subject: kept\n\nbody", &options, &tokens, &mailer).await.unwrap();
        assert_eq!(sent.subject, "kept");
        assert_eq!(addresses(&sent.to), ["ops@x.com", "b@x.com"]);
    }

    #[tokio::test]
    async fn bcc_stops_before_the_network() {
        let tokens = FakeTokens::ok();
        let mailer = RecordingMailer::default();
        let err = relay(
            b"To: a@x.com\nBcc: hidden@x.com\n\nbody",
            &RelayOptions::default(),
            &tokens,
            &mailer,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MtaError::UnsupportedAddressing { .. }));
        assert_eq!(err.exit_code(), 65);
        assert_eq!(tokens.calls(), 0);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn no_recipients_skips_authentication() {
        let tokens = FakeTokens::ok();
        let mailer = RecordingMailer::default();
        let err = relay(b"To: \nSubject: s\n\nbody", &RelayOptions::default(), &tokens, &mailer)
            .await
            .unwrap_err();
        assert!(matches!(err, MtaError::NoRecipients));
        assert_eq!(tokens.calls(), 0);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn cc_without_to_is_not_enough() {
        let tokens = FakeTokens::ok();
        let mailer = RecordingMailer::default();
        let err = relay(b"Cc: c@x.com\n\nbody", &RelayOptions::default(), &tokens, &mailer)
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 67);
        assert_eq!(tokens.calls(), 0);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn failed_authentication_skips_delivery() {
        let tokens = FakeTokens::failing();
        let mailer = RecordingMailer::default();
        let err = relay(b"To: a@x.com\n\nbody", &RelayOptions::default(), &tokens, &mailer)
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 77);
        assert_eq!(tokens.calls(), 1);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn rejected_delivery_is_reported() {
        let tokens = FakeTokens::ok();
        let mailer = RecordingMailer {
            reject_with: Some(400),
            ..RecordingMailer::default()
        };
        let err = relay(b"To: a@x.com\n\nbody", &RelayOptions::default(), &tokens, &mailer)
            .await
            .unwrap_err();
        assert!(matches!(err, MtaError::Delivery { status: 400, .. }));
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn capture_writes_all_three_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let options = RelayOptions {
            debug_dir: Some(tmp.path().join("dbg")),
            ..RelayOptions::default()
        };
        relay(b"To: a@x.com\n\nbody", &options, &FakeTokens::ok(), &RecordingMailer::default())
            .await
            .unwrap();
        let mut extensions: Vec<String> = std::fs::read_dir(tmp.path().join("dbg"))
            .unwrap()
            .map(|e| {
                let path = e.unwrap().path();
                path.extension().unwrap().to_string_lossy().into_owned()
            })
            .collect();
        extensions.sort();
        assert_eq!(extensions, ["json", "raw", "tkn"]);
    }

    #[tokio::test]
    async fn unwritable_capture_does_not_block_delivery() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let options = RelayOptions {
            debug_dir: Some(blocker.join("sub")),
            ..RelayOptions::default()
        };
        let mailer = RecordingMailer::default();
        relay(b"To: a@x.com\n\nbody", &options, &FakeTokens::ok(), &mailer)
            .await
            .unwrap();
        assert_eq!(mailer.sent().len(), 1);
    }
}
