//! smtp-relay filters
//!
//! | type          | hooks                                   |
//! |---------------|-----------------------------------------|
//! | `whitelist`   | connect, mail from, rcpt to             |
//! | `static-auth` | auth                                    |
//! | `http-filter` | every hook, votes on auth and data only |

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
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::module_name_repetitions)]

mod http_filter;
mod static_auth;
mod whitelist;

pub use http_filter::{
    Exchange, HmacAlgorithm, HmacParams, HttpFilter, HttpFilterParams, HttpMethod,
};
pub use static_auth::{StaticAuth, StaticAuthParams};
pub use whitelist::{Pattern, Whitelist, WhitelistParams};

use relay_engine::FilterRegistry;

/// Register the filters of this crate.
pub fn register_builtin(registry: &mut FilterRegistry) -> &mut FilterRegistry {
    registry
        .register("whitelist", |args| {
            Ok(Box::new(Whitelist::new(args.params()?)?))
        })
        .register("static-auth", |args| {
            Ok(Box::new(StaticAuth::from_env(args.params()?)?))
        })
        .register("http-filter", |args| {
            Ok(Box::new(HttpFilter::new(args.params()?)?))
        })
}

#[cfg(test)]
mod tests {
    use super::register_builtin;
    use relay_engine::{BuildArgs, FilterRegistry};

    #[test]
    fn builtin_tags() {
        let mut registry = FilterRegistry::filters();
        register_builtin(&mut registry);

        pretty_assertions::assert_eq!(
            registry.tags().collect::<Vec<_>>(),
            vec!["http-filter", "static-auth", "whitelist"]
        );
    }

    #[test]
    fn build_from_params() {
        let mut registry = FilterRegistry::filters();
        register_builtin(&mut registry);

        let params = serde_json::json!({ "to": ["regexp:.*@x\\.com"] });
        assert!(registry
            .build(
                "whitelist",
                &BuildArgs {
                    flow: "main",
                    name: "whitelist_0",
                    params: &params,
                },
            )
            .is_ok());

        let params = serde_json::json!({ "username": "john", "password": "md5:abc" });
        assert!(registry
            .build(
                "static-auth",
                &BuildArgs {
                    flow: "main",
                    name: "static-auth_0",
                    params: &params,
                },
            )
            .is_err());
    }
}
