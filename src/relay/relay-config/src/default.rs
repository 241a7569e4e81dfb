/*
 * vSMTP mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/

use crate::{
    config::field::{
        FieldCache, FieldServer, FieldServerDNS, FieldServerInterfaces, FieldServerLogs,
        FieldServerSMTP, FieldServerSMTPAuth, FieldServerSMTPError,
    },
    Config,
};
use relay_common::{auth::Mechanism, collection, CodeID, Reply, ReplyCode, RELAY_PORT};

impl Default for Config {
    fn default() -> Self {
        let mut config = Self {
            server: FieldServer::default(),
            cache: FieldCache::default(),
            headers: relay_mail_parser::HeaderRules::default(),
            flows: crate::field::FieldFlows::default(),
        };
        config.complete_codes();
        config
    }
}

impl Default for FieldServer {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            client_count_max: Self::default_client_count_max(),
            message_size_limit: Self::default_message_size_limit(),
            interfaces: FieldServerInterfaces::default(),
            logs: FieldServerLogs::default(),
            smtp: FieldServerSMTP::default(),
            dns: FieldServerDNS::default(),
        }
    }
}

impl Default for FieldServerDNS {
    fn default() -> Self {
        Self::System
    }
}

impl FieldServer {
    pub(crate) fn default_name() -> String {
        "smtp-relay".to_string()
    }

    pub(crate) const fn default_client_count_max() -> i64 {
        16
    }

    pub(crate) const fn default_message_size_limit() -> usize {
        20_000_000
    }
}

impl Default for FieldServerInterfaces {
    fn default() -> Self {
        Self {
            addr: Self::default_addr(),
        }
    }
}

impl FieldServerInterfaces {
    pub(crate) fn default_addr() -> Vec<std::net::SocketAddr> {
        vec![std::net::SocketAddr::new(
            std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
            RELAY_PORT,
        )]
    }
}

impl Default for FieldServerLogs {
    fn default() -> Self {
        Self {
            filepath: Self::default_filepath(),
            level: Self::default_level(),
        }
    }
}

impl FieldServerLogs {
    pub(crate) fn default_filepath() -> std::path::PathBuf {
        "/var/log/smtp-relay/smtp-relay.log".into()
    }

    pub(crate) fn default_level() -> Vec<tracing_subscriber::filter::Directive> {
        vec![tracing_subscriber::filter::Directive::from(
            tracing::level_filters::LevelFilter::WARN,
        )]
    }
}

impl Default for FieldServerSMTPError {
    fn default() -> Self {
        Self {
            soft_count: 10,
            hard_count: 20,
            delay: std::time::Duration::from_millis(5000),
        }
    }
}

impl Default for FieldServerSMTPAuth {
    fn default() -> Self {
        Self {
            mechanisms: Self::default_mechanisms(),
        }
    }
}

impl FieldServerSMTPAuth {
    /// The mechanisms advertised when the configuration does not list any.
    #[must_use]
    pub fn default_mechanisms() -> Vec<Mechanism> {
        vec![Mechanism::Plain, Mechanism::Login]
    }
}

impl Default for FieldServerSMTP {
    fn default() -> Self {
        Self {
            rcpt_count_max: Self::default_rcpt_count_max(),
            error: FieldServerSMTPError::default(),
            timeout_client: Self::default_timeout_client(),
            auth: FieldServerSMTPAuth::default(),
            codes: Self::default_smtp_codes(),
        }
    }
}

impl FieldServerSMTP {
    pub(crate) const fn default_rcpt_count_max() -> usize {
        1000
    }

    pub(crate) const fn default_timeout_client() -> std::time::Duration {
        std::time::Duration::from_secs(30)
    }

    /// Every reply except [`CodeID::Ehlo`], which is generated from the configuration.
    pub(crate) fn default_smtp_codes() -> std::collections::BTreeMap<CodeID, Reply> {
        collection! {
            CodeID::Greetings => Reply::new(
                ReplyCode::Code{ code: 220 }, "{name} Service ready"
            ),
            CodeID::Help => Reply::new(
                ReplyCode::Code{ code: 214 }, "See RFC 5321"
            ),
            CodeID::Closing => Reply::new(
                ReplyCode::Code{ code: 221 }, "Service closing transmission channel"
            ),
            CodeID::Helo => Reply::new(
                ReplyCode::Code{ code: 250 }, "{name}"
            ),
            CodeID::DataStart => Reply::new(
                ReplyCode::Code{ code: 354 }, "Start mail input; end with <CRLF>.<CRLF>"
            ),
            CodeID::Ok => Reply::new(
                ReplyCode::Code{ code: 250 }, "Ok"
            ),
            CodeID::Refused => Reply::new(
                ReplyCode::Enhanced{ code: 550, enhanced: "5.7.1".to_string() }, "Message refused"
            ),
            CodeID::ConnectionRefused => Reply::new(
                ReplyCode::Code{ code: 554 }, "Connection refused"
            ),
            CodeID::Failure => Reply::new(
                ReplyCode::Code{ code: 451 }, "Requested action aborted: local error in processing"
            ),
            CodeID::UnrecognizedCommand => Reply::new(
                ReplyCode::Code{ code: 500 }, "Syntax error command unrecognized"
            ),
            CodeID::SyntaxErrorParams => Reply::new(
                ReplyCode::Code{ code: 501 }, "Syntax error in parameters or arguments"
            ),
            CodeID::Unimplemented => Reply::new(
                ReplyCode::Code{ code: 502 }, "Command not implemented"
            ),
            CodeID::BadSequence => Reply::new(
                ReplyCode::Code{ code: 503 }, "Bad sequence of commands"
            ),
            CodeID::MessageSizeExceeded => Reply::new(
                ReplyCode::Enhanced{ code: 552, enhanced: "5.3.4".to_string() }, "Message size exceeds fixed maximum message size"
            ),
            CodeID::AuthSucceeded => Reply::new(
                ReplyCode::Enhanced{ code: 235, enhanced: "2.7.0".to_string() }, "Authentication succeeded"
            ),
            CodeID::AuthMechNotSupported => Reply::new(
                ReplyCode::Enhanced{ code: 504, enhanced: "5.5.4".to_string() }, "Mechanism is not supported"
            ),
            CodeID::AuthInvalidCredentials => Reply::new(
                ReplyCode::Enhanced{ code: 535, enhanced: "5.7.8".to_string() }, "Authentication credentials invalid"
            ),
            CodeID::AuthClientCanceled => Reply::new(
                ReplyCode::Code{ code: 501 }, "Authentication canceled by client"
            ),
            CodeID::AuthErrorDecode64 => Reply::new(
                ReplyCode::Enhanced{ code: 501, enhanced: "5.5.2".to_string() }, "Invalid, not base64"
            ),
            CodeID::AuthAlreadyDone => Reply::new(
                ReplyCode::Enhanced{ code: 503, enhanced: "5.5.1".to_string() }, "Already authenticated"
            ),
            CodeID::ConnectionMaxReached => Reply::new(
                ReplyCode::Code{ code: 554 }, "Cannot process connection, closing"
            ),
            CodeID::TooManyError => Reply::new(
                ReplyCode::Code{ code: 421 }, "Too many errors from the client"
            ),
            CodeID::Timeout => Reply::new(
                ReplyCode::Code{ code: 451 }, "Timeout - closing connection"
            ),
            CodeID::TooManyRecipients => Reply::new(
                ReplyCode::Code{ code: 452 }, "Requested action not taken: too many recipients"
            ),
        }
    }
}

impl Default for FieldCache {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
            keep: false,
        }
    }
}

impl FieldCache {
    pub(crate) fn default_path() -> String {
        ".email_${iso8601}_${id}_${sequence}.eml".to_string()
    }
}
