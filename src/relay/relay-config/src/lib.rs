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
#![allow(clippy::use_self)] // false positive


mod parser {
    pub mod socket_addr;
    pub mod tracing_directive;
}

mod config;
mod default;
mod dns_helper;
mod ensure;

pub use config::{field, Config};
pub use dns_helper::build_resolver;

use anyhow::Context;

impl Config {
    /// Parse a [`Config`] with JSON format.
    ///
    /// # Errors
    ///
    /// * data is not a valid JSON
    /// * one field is unknown
    /// * a flow or a component is ill-formed
    pub fn from_json(input: &str) -> anyhow::Result<Self> {
        serde_json::from_str::<Self>(input)
            .map_err(anyhow::Error::new)?
            .ensure()
    }

    /// Parse a [`Config`] with YAML format.
    ///
    /// # Errors
    ///
    /// * data is not a valid YAML
    /// * one field is unknown
    /// * a flow or a component is ill-formed
    pub fn from_yaml(input: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str::<Self>(input)
            .map_err(anyhow::Error::new)?
            .ensure()
    }

    /// Read the file and parse it according to its extension
    /// (`.json`, `.yaml` or `.yml`).
    ///
    /// # Errors
    ///
    /// * the file cannot be read
    /// * the extension is not supported
    /// * see [`Config::from_json`] and [`Config::from_yaml`]
    pub fn from_path(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read file '{}'", path.display()))?;

        match path.extension().and_then(std::ffi::OsStr::to_str) {
            Some("json") => Self::from_json(&content),
            Some("yaml" | "yml") => Self::from_yaml(&content),
            _ => anyhow::bail!(
                "Unsupported configuration format '{}', expected .json, .yaml or .yml",
                path.display()
            ),
        }
        .with_context(|| format!("Cannot parse configuration '{}'", path.display()))
    }
}
