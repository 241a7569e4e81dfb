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

use crate::{config::local_test, recorder::Recorder, tests::recipients_router, test_receiver};

#[tokio::test]
async fn ehlo_advertises_the_mechanisms() {
    test_receiver! {
        "EHLO foo\r\nNOOP\r\nHELP\r\nQUIT\r\n",
        concat![
            "220 testserver.com Service ready\r\n",
            "250-testserver.com\r\n",
            "250-8BITMIME\r\n",
            "250-SMTPUTF8\r\n",
            "250 AUTH PLAIN LOGIN\r\n",
            "250 Ok\r\n",
            "214 See RFC 5321\r\n",
            "221 Service closing transmission channel\r\n",
        ]
    }
    .unwrap();
}

#[rstest::rstest]
#[case::unknown("FOO bar\r\n", "500 Syntax error command unrecognized\r\n")]
#[case::vrfy("VRFY john\r\n", "502 Command not implemented\r\n")]
#[case::mail_before_helo("MAIL FROM:<john@doe.com>\r\n", "503 Bad sequence of commands\r\n")]
#[case::data_before_rcpt("DATA\r\n", "503 Bad sequence of commands\r\n")]
#[tokio::test]
async fn invalid_commands(#[case] command: &str, #[case] reply: &str) {
    test_receiver! {
        [command, "QUIT\r\n"].concat(),
        [
            "220 testserver.com Service ready\r\n",
            reply,
            "221 Service closing transmission channel\r\n",
        ].concat()
    }
    .unwrap();
}

#[rstest::rstest]
#[case::reverse_path("MAIL FROM:<not an address>\r\n")]
#[case::no_brackets("MAIL FROM:john@doe.com\r\n")]
#[tokio::test]
async fn invalid_sender(#[case] command: &str) {
    test_receiver! {
        ["HELO foo\r\n", command, "QUIT\r\n"].concat(),
        concat![
            "220 testserver.com Service ready\r\n",
            "250 testserver.com\r\n",
            "501 Syntax error in parameters or arguments\r\n",
            "221 Service closing transmission channel\r\n",
        ]
    }
    .unwrap();
}

#[tokio::test]
async fn rset_drops_the_transaction() {
    let recorder = Recorder::default();

    test_receiver! {
        with_config => local_test(),
        with_router => recipients_router(&["regexp:.*"], &recorder),
        concat![
            "HELO foo\r\n",
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<jane@doe.com>\r\n",
            "RSET\r\n",
            "DATA\r\n",
            "MAIL FROM:<a@b.com>\r\n",
            "RCPT TO:<c@d.com>\r\n",
            "DATA\r\n",
            ".\r\n",
            "QUIT\r\n",
        ],
        concat![
            "220 testserver.com Service ready\r\n",
            "250 testserver.com\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "503 Bad sequence of commands\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "354 Start mail input; end with <CRLF>.<CRLF>\r\n",
            "250 Ok\r\n",
            "221 Service closing transmission channel\r\n",
        ]
    }
    .unwrap();

    let records = recorder.records();
    pretty_assertions::assert_eq!(records.len(), 1);
    pretty_assertions::assert_eq!(
        records[0].envelope.mail_from,
        Some(relay_common::addr!("a@b.com"))
    );
}

#[tokio::test]
async fn too_many_recipients() {
    let mut config = local_test();
    config.server.smtp.rcpt_count_max = 1;

    test_receiver! {
        with_config => config,
        concat![
            "HELO foo\r\n",
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<a@doe.com>\r\n",
            "RCPT TO:<b@doe.com>\r\n",
            "QUIT\r\n",
        ],
        concat![
            "220 testserver.com Service ready\r\n",
            "250 testserver.com\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "452 Requested action not taken: too many recipients\r\n",
            "221 Service closing transmission channel\r\n",
        ]
    }
    .unwrap();
}

#[tokio::test]
async fn too_many_errors() {
    let mut config = local_test();
    config.server.smtp.error.hard_count = 2;

    test_receiver! {
        with_config => config,
        "FOO\r\nBAR\r\nQUIT\r\n",
        concat![
            "220 testserver.com Service ready\r\n",
            "500 Syntax error command unrecognized\r\n",
            "421-Syntax error command unrecognized\r\n",
            "421 Too many errors from the client\r\n",
        ]
    }
    .unwrap();
}
