//!
//! # Configuration
//!
//! The type [`Config`] can be read from a JSON or a YAML file with
//! [`Config::from_path`], or from a string with [`Config::from_json`] and
//! [`Config::from_yaml`]. Every field is optional.

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

use crate::field::FieldServerDNS;
use trust_dns_resolver::{
    config::{ResolverConfig, ResolverOpts},
    error::ResolveError,
    TokioAsyncResolver,
};

/// Build the resolver configured in `server.dns`, `None` if lookups are disabled.
///
/// # Errors
///
/// * the system configuration cannot be read
pub fn build_resolver(config: &FieldServerDNS) -> Result<Option<TokioAsyncResolver>, ResolveError> {
    match config {
        FieldServerDNS::None => Ok(None),
        FieldServerDNS::System => TokioAsyncResolver::tokio_from_system_conf().map(Some),
        FieldServerDNS::Google => {
            TokioAsyncResolver::tokio(ResolverConfig::google(), ResolverOpts::default()).map(Some)
        }
        FieldServerDNS::CloudFlare => {
            TokioAsyncResolver::tokio(ResolverConfig::cloudflare(), ResolverOpts::default())
                .map(Some)
        }
    }
}
