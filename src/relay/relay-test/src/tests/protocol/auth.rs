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
    config::local_test,
    recorder::Recorder,
    test_receiver,
    tests::{auth_router, auth_router_with},
};
use base64::Engine;
use relay_common::{auth::Mechanism, Operator};

fn encode(input: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(input)
}

#[tokio::test]
async fn plain_with_initial_response() {
    let recorder = Recorder::default();

    test_receiver! {
        with_config => local_test(),
        with_router => auth_router(&recorder),
        [
            "EHLO client.com\r\n",
            &format!("AUTH PLAIN {}\r\n", encode("\0john\0doe")),
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<jane@doe.com>\r\n",
            "DATA\r\n",
            ".\r\n",
            "QUIT\r\n",
        ].concat(),
        [
            "220 testserver.com Service ready\r\n",
            "250-testserver.com\r\n",
            "250-8BITMIME\r\n",
            "250-SMTPUTF8\r\n",
            "250 AUTH PLAIN LOGIN\r\n",
            "235 2.7.0 Authentication succeeded\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "354 Start mail input; end with <CRLF>.<CRLF>\r\n",
            "250 Ok\r\n",
            "221 Service closing transmission channel\r\n",
        ].concat()
    }
    .unwrap();

    let records = recorder.records();
    pretty_assertions::assert_eq!(records.len(), 1);
    pretty_assertions::assert_eq!(records[0].identity.as_deref(), Some("john"));
}

#[tokio::test]
async fn login_with_challenges() {
    let recorder = Recorder::default();

    test_receiver! {
        with_config => local_test(),
        with_router => auth_router(&recorder),
        [
            "EHLO client.com\r\n",
            "AUTH LOGIN\r\n",
            &format!("{}\r\n", encode("john")),
            &format!("{}\r\n", encode("doe")),
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<jane@doe.com>\r\n",
            "QUIT\r\n",
        ].concat(),
        [
            "220 testserver.com Service ready\r\n",
            "250-testserver.com\r\n",
            "250-8BITMIME\r\n",
            "250-SMTPUTF8\r\n",
            "250 AUTH PLAIN LOGIN\r\n",
            "334 VXNlcm5hbWU6\r\n",
            "334 UGFzc3dvcmQ6\r\n",
            "235 2.7.0 Authentication succeeded\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "221 Service closing transmission channel\r\n",
        ].concat()
    }
    .unwrap();
}

#[tokio::test]
async fn invalid_credentials_leave_the_flow_pending() {
    let recorder = Recorder::default();

    test_receiver! {
        with_config => local_test(),
        with_router => auth_router(&recorder),
        [
            "HELO client.com\r\n",
            &format!("AUTH PLAIN {}\r\n", encode("\0john\0wrong")),
            &format!("AUTH PLAIN {}\r\n", encode("\0john\0doe")),
            "QUIT\r\n",
        ].concat(),
        [
            "220 testserver.com Service ready\r\n",
            "250 testserver.com\r\n",
            "535 5.7.8 Authentication credentials invalid\r\n",
            "235 2.7.0 Authentication succeeded\r\n",
            "221 Service closing transmission channel\r\n",
        ].concat()
    }
    .unwrap();
}

#[tokio::test]
async fn or_flow_does_not_veto_authentication() {
    let recorder = Recorder::default();

    test_receiver! {
        with_config => local_test(),
        with_router => auth_router_with(Operator::Or, &recorder),
        [
            "HELO client.com\r\n",
            &format!("AUTH PLAIN {}\r\n", encode("\0john\0wrong")),
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<jane@doe.com>\r\n",
            "QUIT\r\n",
        ].concat(),
        [
            "220 testserver.com Service ready\r\n",
            "250 testserver.com\r\n",
            "235 2.7.0 Authentication succeeded\r\n",
            "250 Ok\r\n",
            "550 5.7.1 Message refused\r\n",
            "221 Service closing transmission channel\r\n",
        ].concat()
    }
    .unwrap();

    assert!(recorder.records().is_empty());
}

#[tokio::test]
async fn unauthenticated_recipient_refused() {
    let recorder = Recorder::default();

    test_receiver! {
        with_config => local_test(),
        with_router => auth_router(&recorder),
        concat![
            "HELO client.com\r\n",
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<jane@doe.com>\r\n",
            "QUIT\r\n",
        ],
        concat![
            "220 testserver.com Service ready\r\n",
            "250 testserver.com\r\n",
            "250 Ok\r\n",
            "550 5.7.1 Message refused\r\n",
            "221 Service closing transmission channel\r\n",
        ]
    }
    .unwrap();
}

#[tokio::test]
async fn already_authenticated() {
    let recorder = Recorder::default();

    test_receiver! {
        with_config => local_test(),
        with_router => auth_router(&recorder),
        [
            "HELO client.com\r\n",
            &format!("AUTH PLAIN {}\r\n", encode("\0john\0doe")),
            &format!("AUTH PLAIN {}\r\n", encode("\0john\0doe")),
            "QUIT\r\n",
        ].concat(),
        [
            "220 testserver.com Service ready\r\n",
            "250 testserver.com\r\n",
            "235 2.7.0 Authentication succeeded\r\n",
            "503 5.5.1 Already authenticated\r\n",
            "221 Service closing transmission channel\r\n",
        ].concat()
    }
    .unwrap();
}

#[rstest::rstest]
#[case::unknown("AUTH CRAM-MD5\r\n", "504 5.5.4 Mechanism is not supported\r\n")]
#[case::disabled("AUTH LOGIN\r\n", "504 5.5.4 Mechanism is not supported\r\n")]
#[case::canceled("AUTH PLAIN\r\n*\r\n", "334 \r\n501 Authentication canceled by client\r\n")]
#[case::not_base64("AUTH PLAIN\r\n!!!\r\n", "334 \r\n501 5.5.2 Invalid, not base64\r\n")]
#[tokio::test]
async fn sasl_errors(#[case] auth: &str, #[case] reply: &str) {
    let recorder = Recorder::default();
    let mut config = local_test();
    config.server.smtp.auth.mechanisms = vec![Mechanism::Plain];

    test_receiver! {
        with_config => config,
        with_router => auth_router(&recorder),
        ["HELO client.com\r\n", auth, "QUIT\r\n"].concat(),
        [
            "220 testserver.com Service ready\r\n",
            "250 testserver.com\r\n",
            reply,
            "221 Service closing transmission channel\r\n",
        ].concat()
    }
    .unwrap();
}
