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

use relay_config::Config;

/// Directory of the body cache of the tests.
#[must_use]
pub fn cache_dir() -> std::path::PathBuf {
    std::env::temp_dir().join("smtp-relay-test")
}

/// A configuration named `testserver.com` with the `flows` given as JSON.
///
/// # Panics
///
/// * the flows are ill-formed
#[must_use]
pub fn with_flows(flows: serde_json::Value) -> Config {
    let cache = cache_dir().join("${id}_${sequence}.eml");
    Config::from_json(
        &serde_json::json!({
            "server": {
                "name": "testserver.com",
                "dns": { "type": "none" },
                "smtp": {
                    "error": { "soft_count": -1, "hard_count": -1, "delay": "0s" }
                }
            },
            "cache": { "path": cache.display().to_string() },
            "flows": flows,
        })
        .to_string(),
    )
    .unwrap()
}

/// A configuration with one flow `main` accepting every recipient and logging the messages.
#[must_use]
pub fn local_test() -> Config {
    with_flows(serde_json::json!({
        "main": {
            "filters": [ { "type": "whitelist", "to": ["regexp:.*"] } ],
            "outputs": [ { "type": "log" } ]
        }
    }))
}
