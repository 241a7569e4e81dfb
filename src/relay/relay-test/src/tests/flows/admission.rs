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

use crate::tests::{recipients_flow, recipients_router};
use crate::{config::local_test, recorder::Recorder, test_receiver};
use relay_common::{addr, Operator};
use relay_engine::{CounterKey, Flow, Router};
use relay_filter::{Whitelist, WhitelistParams};

#[tokio::test]
async fn refused_recipient_does_not_drop_the_accepted_one() {
    let recorder = Recorder::default();
    let router = std::sync::Arc::new(recipients_router(&["good@x.com"], &recorder));

    crate::receiver::test_receiver_inner(
        concat![
            "HELO foo\r\n",
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<good@x.com>\r\n",
            "RCPT TO:<bad@x.com>\r\n",
            "DATA\r\n",
            "Subject: hello\r\n",
            "\r\n",
            "body\r\n",
            ".\r\n",
            "QUIT\r\n",
        ]
        .as_bytes(),
        concat![
            "220 testserver.com Service ready\r\n",
            "250 testserver.com\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "550 5.7.1 Message refused\r\n",
            "354 Start mail input; end with <CRLF>.<CRLF>\r\n",
            "250 Ok\r\n",
            "221 Service closing transmission channel\r\n",
        ]
        .as_bytes(),
        std::sync::Arc::new(local_test()),
        router.clone(),
    )
    .await
    .unwrap();

    let records = recorder.records();
    pretty_assertions::assert_eq!(records.len(), 1);
    pretty_assertions::assert_eq!(records[0].envelope.mail_from, Some(addr!("john@doe.com")));
    pretty_assertions::assert_eq!(records[0].envelope.rcpt_to, vec![addr!("good@x.com")]);
    pretty_assertions::assert_eq!(records[0].body, "Subject: hello\r\n\r\nbody\r\n");

    let counters = router.counters();
    pretty_assertions::assert_eq!(
        counters.get(&CounterKey::Accepted {
            flow: "main".to_string()
        }),
        1
    );
    pretty_assertions::assert_eq!(counters.get(&CounterKey::Rejected), 1);
}

#[tokio::test]
async fn every_recipient_refused() {
    let recorder = Recorder::default();

    test_receiver! {
        with_config => local_test(),
        with_router => recipients_router(&["good@x.com"], &recorder),
        concat![
            "HELO foo\r\n",
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<bad@x.com>\r\n",
            "DATA\r\n",
            "QUIT\r\n",
        ],
        concat![
            "220 testserver.com Service ready\r\n",
            "250 testserver.com\r\n",
            "250 Ok\r\n",
            "550 5.7.1 Message refused\r\n",
            "503 Bad sequence of commands\r\n",
            "221 Service closing transmission channel\r\n",
        ]
    }
    .unwrap();

    assert!(recorder.records().is_empty());
}

#[tokio::test]
async fn no_flow_refuses_the_connection() {
    test_receiver! {
        with_config => crate::config::with_flows(serde_json::json!({})),
        with_router => Router::default(),
        "HELO foo\r\nQUIT\r\n",
        "554 Connection refused\r\n"
    }
    .unwrap();
}

#[tokio::test]
async fn refused_sender_keeps_the_session_open() {
    let recorder = Recorder::default();
    let router = Router::new(vec![Flow::new("main", Operator::And)
        .with_filter(
            "senders",
            Box::new(
                Whitelist::new(WhitelistParams {
                    from: Some(vec!["regexp:.*@doe\\.com".to_string()]),
                    to: Some(vec!["regexp:.*".to_string()]),
                    ..WhitelistParams::default()
                })
                .unwrap(),
            ),
        )
        .with_output("recorder", Box::new(recorder.clone()))]);

    test_receiver! {
        with_config => local_test(),
        with_router => router,
        concat![
            "HELO foo\r\n",
            "MAIL FROM:<jane@spam.com>\r\n",
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<anyone@x.com>\r\n",
            "DATA\r\n",
            ".\r\n",
            "QUIT\r\n",
        ],
        concat![
            "220 testserver.com Service ready\r\n",
            "250 testserver.com\r\n",
            "550 5.7.1 Message refused\r\n",
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
    pretty_assertions::assert_eq!(records[0].envelope.mail_from, Some(addr!("john@doe.com")));
}

#[tokio::test]
async fn message_dispatched_to_the_flows_that_admitted_it() {
    let archive = Recorder::default();
    let local = Recorder::default();
    let router = Router::new(vec![
        recipients_flow("archive", &["regexp:.*@archive\\.com"], &archive),
        Flow::new("local", Operator::Or)
            .with_filter(
                "whitelist_0",
                Box::new(
                    Whitelist::new(WhitelistParams {
                        ips: Some(vec!["127.0.0.1".to_string()]),
                        ..WhitelistParams::default()
                    })
                    .unwrap(),
                ),
            )
            .with_output("recorder", Box::new(local.clone())),
    ]);

    test_receiver! {
        with_config => local_test(),
        with_router => router,
        concat![
            "HELO foo\r\n",
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<jane@doe.com>\r\n",
            "DATA\r\n",
            ".\r\n",
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<box@archive.com>\r\n",
            "DATA\r\n",
            ".\r\n",
            "QUIT\r\n",
        ],
        concat![
            "220 testserver.com Service ready\r\n",
            "250 testserver.com\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "354 Start mail input; end with <CRLF>.<CRLF>\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "354 Start mail input; end with <CRLF>.<CRLF>\r\n",
            "250 Ok\r\n",
            "221 Service closing transmission channel\r\n",
        ]
    }
    .unwrap();

    pretty_assertions::assert_eq!(
        archive
            .records()
            .into_iter()
            .map(|i| i.envelope.rcpt_to)
            .collect::<Vec<_>>(),
        vec![vec![addr!("box@archive.com")]]
    );
    pretty_assertions::assert_eq!(
        local
            .records()
            .into_iter()
            .map(|i| i.envelope.rcpt_to)
            .collect::<Vec<_>>(),
        vec![vec![addr!("jane@doe.com")], vec![addr!("box@archive.com")]]
    );
}

#[tokio::test]
async fn failing_processor_does_not_stop_the_others() {
    let failing = Recorder::failing();
    let recorder = Recorder::default();
    let router = std::sync::Arc::new(Router::new(vec![recipients_flow(
        "main",
        &["regexp:.*"],
        &recorder,
    )
    .with_output("broken", Box::new(failing.clone()))
    .with_output("second", Box::new(recorder.clone()))]));

    crate::receiver::test_receiver_inner(
        concat![
            "HELO foo\r\n",
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<jane@doe.com>\r\n",
            "DATA\r\n",
            ".\r\n",
            "QUIT\r\n",
        ]
        .as_bytes(),
        concat![
            "220 testserver.com Service ready\r\n",
            "250 testserver.com\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "354 Start mail input; end with <CRLF>.<CRLF>\r\n",
            "250 Ok\r\n",
            "221 Service closing transmission channel\r\n",
        ]
        .as_bytes(),
        std::sync::Arc::new(local_test()),
        router.clone(),
    )
    .await
    .unwrap();

    pretty_assertions::assert_eq!(failing.records().len(), 1);
    pretty_assertions::assert_eq!(recorder.records().len(), 2);
    pretty_assertions::assert_eq!(
        router.counters().get(&CounterKey::Error {
            flow: "main".to_string(),
            output: "broken".to_string()
        }),
        1
    );
}
