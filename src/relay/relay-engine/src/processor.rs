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

use relay_common::Session;

/// A delivery backend, run once per message for every flow that admitted it.
///
/// An error is logged and counted by the router, it never prevents the other
/// processors from running.
#[async_trait::async_trait]
pub trait Processor: Send + Sync {
    /// The message is available at `session.body_path` and parsed in `session.message`.
    async fn on_mail(&self, session: &Session) -> anyhow::Result<()>;
}

/// Result of one processor for one message.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ProcessorOutcome {
    /// Name of the flow.
    pub flow: String,
    /// Name of the processor in the flow.
    pub output: String,
    /// The error chain if the processor failed.
    pub error: Option<String>,
}

impl ProcessorOutcome {
    ///
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
