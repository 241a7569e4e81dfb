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
async fn message_size_exceeded() {
    let recorder = Recorder::default();
    let mut config = local_test();
    config.server.message_size_limit = 100;

    test_receiver! {
        with_config => config,
        with_router => recipients_router(&["regexp:.*"], &recorder),
        [
            "HELO foo\r\n",
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<jane@doe.com>\r\n",
            "DATA\r\n",
            &("X".repeat(200) + "\r\n"),
            ".\r\n",
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<jane@doe.com>\r\n",
            "DATA\r\n",
            "small\r\n",
            ".\r\n",
            "QUIT\r\n",
        ].concat(),
        concat![
            "220 testserver.com Service ready\r\n",
            "250 testserver.com\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "354 Start mail input; end with <CRLF>.<CRLF>\r\n",
            "552 5.3.4 Message size exceeds fixed maximum message size\r\n",
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
    pretty_assertions::assert_eq!(records[0].body, "small\r\n");
}
