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

use crate::{config::local_test, test_receiver};

#[tokio::test]
async fn kept_bodies_are_numbered_per_connection() {
    let cache = tempfile::tempdir().unwrap();

    let mut config = local_test();
    config.cache.path = cache.path().join("${id}_${sequence}.eml").display().to_string();
    config.cache.keep = true;

    test_receiver! {
        with_config => config,
        concat![
            "HELO foo\r\n",
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<jane@doe.com>\r\n",
            "DATA\r\n",
            "Subject: first\r\n",
            "\r\n",
            ".\r\n",
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<jane@doe.com>\r\n",
            "DATA\r\n",
            "Subject: second\r\n",
            "\r\n",
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

    let mut bodies = std::fs::read_dir(cache.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect::<Vec<_>>();
    bodies.sort();

    pretty_assertions::assert_eq!(bodies.len(), 2);
    assert!(bodies[0].display().to_string().ends_with("_1.eml"));
    assert!(bodies[1].display().to_string().ends_with("_2.eml"));
    pretty_assertions::assert_eq!(
        std::fs::read_to_string(&bodies[0]).unwrap(),
        "Subject: first\r\n\r\n"
    );
    pretty_assertions::assert_eq!(
        std::fs::read_to_string(&bodies[1]).unwrap(),
        "Subject: second\r\n\r\n"
    );
}

#[tokio::test]
async fn a_taken_cache_path_fails_the_message() {
    let cache = tempfile::tempdir().unwrap();
    std::fs::write(cache.path().join("taken.eml"), "someone else\r\n").unwrap();

    let mut config = local_test();
    config.cache.path = cache.path().join("taken.eml").display().to_string();

    test_receiver! {
        with_config => config,
        concat![
            "HELO foo\r\n",
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<jane@doe.com>\r\n",
            "DATA\r\n",
            "Subject: mine\r\n",
            "\r\n",
            ".\r\n",
            "QUIT\r\n",
        ],
        concat![
            "220 testserver.com Service ready\r\n",
            "250 testserver.com\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "354 Start mail input; end with <CRLF>.<CRLF>\r\n",
            "451 Requested action aborted: local error in processing\r\n",
            "221 Service closing transmission channel\r\n",
        ]
    }
    .unwrap();

    pretty_assertions::assert_eq!(
        std::fs::read_to_string(cache.path().join("taken.eml")).unwrap(),
        "someone else\r\n"
    );
    pretty_assertions::assert_eq!(std::fs::read_dir(cache.path()).unwrap().count(), 1);
}
