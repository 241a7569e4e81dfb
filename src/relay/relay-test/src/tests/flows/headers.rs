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

use crate::{config::with_flows, test_receiver};
use relay_mail_parser::{HeaderRule, HeaderRules};

#[tokio::test]
async fn file_output_receives_the_rewritten_message() {
    let archive = tempfile::tempdir().unwrap();

    let mut config = with_flows(serde_json::json!({
        "main": {
            "filters": [ { "type": "whitelist", "to": ["regexp:.*"] } ],
            "outputs": [ {
                "type": "file",
                "path": archive.path().display().to_string(),
                "filename": "${id}.eml"
            } ]
        }
    }));
    config.headers = HeaderRules::new(vec![
        HeaderRule::Remove {
            name: "X-Mailer".to_string(),
        },
        HeaderRule::Append {
            name: "X-Relayed-By".to_string(),
            value: "smtp-relay".to_string(),
        },
    ]);

    test_receiver! {
        with_config => config,
        concat![
            "HELO foo\r\n",
            "MAIL FROM:<john@doe.com>\r\n",
            "RCPT TO:<jane@doe.com>\r\n",
            "DATA\r\n",
            "Subject: hi\r\n",
            "X-Mailer: outlook\r\n",
            "\r\n",
            "body\r\n",
            "..dot\r\n",
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
            "221 Service closing transmission channel\r\n",
        ]
    }
    .unwrap();

    let files = std::fs::read_dir(archive.path())
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    pretty_assertions::assert_eq!(files.len(), 1);
    pretty_assertions::assert_eq!(
        std::fs::read_to_string(files[0].path()).unwrap(),
        "Subject: hi\r\nX-Relayed-By: smtp-relay\r\n\r\nbody\r\n.dot\r\n"
    );
}
