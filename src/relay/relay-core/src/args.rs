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

/// A duration written in a human readable form, such as `30s` or `1h 15m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout(pub std::time::Duration);

impl std::str::FromStr for Timeout {
    type Err = humantime::DurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        humantime::parse_duration(s).map(Timeout)
    }
}

///
#[derive(Debug, Clone, PartialEq, Eq, clap::Parser)]
#[command(about, long_about = None, disable_version_flag = true)]
pub struct Args {
    /// Print the version and exit
    #[arg(short = 'V', long)]
    pub version: bool,

    /// Path of the configuration file, `.json`, `.yaml` or `.yml`
    #[arg(short, long)]
    pub config: Option<std::path::PathBuf>,

    ///
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Write the logs to the standard output, in addition to the log file
    #[arg(long)]
    pub stdout: bool,

    /// Stop the server after this delay
    #[arg(short, long)]
    pub timeout: Option<Timeout>,
}

///
#[derive(Debug, Clone, PartialEq, Eq, clap::Subcommand)]
pub enum Commands {
    /// Show the loaded config (as serialized json format)
    ConfigShow,
}
