//! smtp-relay executable

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

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
//
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::doc_markdown)]
#![allow(clippy::multiple_crate_versions)]

mod args;

pub use args::{Args, Commands, Timeout};

///
pub mod tracing_subscriber;

use anyhow::Context;
use relay_config::Config;
use relay_engine::{FilterRegistry, ProcessorRegistry, Router};

/// The registries of every filter and processor shipped with the relay.
#[must_use]
pub fn builtin_registries() -> (FilterRegistry, ProcessorRegistry) {
    let mut filters = FilterRegistry::filters();
    relay_filter::register_builtin(&mut filters);

    let mut processors = ProcessorRegistry::processors();
    relay_delivery::register_builtin(&mut processors);

    (filters, processors)
}

/// Instantiate the flows of the configuration.
///
/// # Errors
///
/// * a component has an unknown type
/// * a component refused its parameters
pub fn build_router(config: &Config) -> anyhow::Result<Router> {
    let (filters, processors) = builtin_registries();
    Router::from_config(config, &filters, &processors).context("Cannot build the flows")
}

#[cfg(test)]
mod tests {
    use super::build_router;
    use relay_config::Config;

    #[test]
    fn flows_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_json(&format!(
            r#"{{
                "flows": {{
                    "main": {{
                        "filters": [ {{ "type": "whitelist", "to": ["regexp:.*@x\\.com"] }} ],
                        "outputs": [ {{ "type": "log" }} ]
                    }},
                    "archive": {{
                        "filters_operator": "OR",
                        "outputs": [ {{ "type": "file", "path": {:?} }} ]
                    }}
                }}
            }}"#,
            dir.path().join("archive")
        ))
        .unwrap();

        let router = build_router(&config).unwrap();
        pretty_assertions::assert_eq!(
            router
                .flows()
                .iter()
                .map(relay_engine::Flow::name)
                .collect::<Vec<_>>(),
            vec!["main", "archive"]
        );
        assert!(dir.path().join("archive").is_dir());
    }

    #[test]
    fn unknown_type() {
        let config = Config::from_json(
            r#"{ "flows": { "main": { "filters": [ { "type": "dnsbl" } ] } } }"#,
        )
        .unwrap();

        let error = build_router(&config).unwrap_err();
        pretty_assertions::assert_eq!(
            format!("{error:#}"),
            "Cannot build the flows: unknown filter type `dnsbl`"
        );
    }

    #[test]
    fn demo_configuration() {
        for name in ["relay.yaml", "relay.json"] {
            let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
                .join("../../../demos")
                .join(name);
            Config::from_path(&path).unwrap();
        }
    }
}
