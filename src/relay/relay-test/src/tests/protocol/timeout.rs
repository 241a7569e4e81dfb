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
    receiver::{router_of, run_connection},
};
use tokio::io::AsyncReadExt;

#[tokio::test]
async fn idle_client_disconnected() {
    let mut config = local_test();
    config.server.smtp.timeout_client = std::time::Duration::from_millis(100);
    let router = router_of(&config);

    let (mut client, server) = tokio::io::duplex(1024);
    run_connection(server, std::sync::Arc::new(config), std::sync::Arc::new(router))
        .await
        .unwrap();

    let mut output = String::new();
    client.read_to_string(&mut output).await.unwrap();
    pretty_assertions::assert_eq!(
        output,
        concat![
            "220 testserver.com Service ready\r\n",
            "451 Timeout - closing connection\r\n",
        ]
    );
}
