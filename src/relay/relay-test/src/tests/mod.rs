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

use crate::recorder::Recorder;
use relay_common::Operator;
use relay_engine::{Flow, Router};
use relay_filter::{StaticAuth, StaticAuthParams, Whitelist, WhitelistParams};

mod flows {
    mod admission;
    mod cache;
    mod headers;
}
mod protocol {
    mod auth;
    mod commands;
    mod message_size;
    mod timeout;
}

/// `main` admits the recipients matching `to` and hands the messages to `recorder`.
fn recipients_flow(name: &str, to: &[&str], recorder: &Recorder) -> Flow {
    Flow::new(name, Operator::And)
        .with_filter(
            "whitelist_0",
            Box::new(
                Whitelist::new(WhitelistParams {
                    to: Some(to.iter().map(ToString::to_string).collect()),
                    ..WhitelistParams::default()
                })
                .unwrap(),
            ),
        )
        .with_output("recorder", Box::new(recorder.clone()))
}

fn recipients_router(to: &[&str], recorder: &Recorder) -> Router {
    Router::new(vec![recipients_flow("main", to, recorder)])
}

/// `submission` admits the user `john`, password `doe`.
fn auth_router(recorder: &Recorder) -> Router {
    auth_router_with(Operator::And, recorder)
}

fn auth_router_with(operator: Operator, recorder: &Recorder) -> Router {
    Router::new(vec![Flow::new("submission", operator)
        .with_filter(
            "users",
            Box::new(
                StaticAuth::with_lookup(
                    StaticAuthParams {
                        username: Some("john".to_string()),
                        password: Some("plain:doe".to_string()),
                        salt: None,
                    },
                    |_| None,
                )
                .unwrap(),
            ),
        )
        .with_output("recorder", Box::new(recorder.clone()))])
}
