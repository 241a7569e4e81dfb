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

use relay_common::{Envelope, Session};
use relay_engine::Processor;

/// What a [`Recorder`] saw of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    ///
    pub envelope: Envelope,
    ///
    pub identity: Option<String>,
    /// Content of the body cache.
    pub body: String,
}

/// A processor keeping a copy of every message it is given.
///
/// Clones share the same records.
#[derive(Debug, Default, Clone)]
pub struct Recorder {
    records: std::sync::Arc<std::sync::Mutex<Vec<Record>>>,
    fail: bool,
}

impl Recorder {
    /// A recorder returning an error after recording.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// The messages recorded so far.
    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait::async_trait]
impl Processor for Recorder {
    async fn on_mail(&self, session: &Session) -> anyhow::Result<()> {
        let body = match &session.body_path {
            Some(path) => tokio::fs::read_to_string(path).await?,
            None => String::new(),
        };

        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(Record {
                envelope: session.envelope.clone(),
                identity: session.identity.clone(),
                body,
            });

        if self.fail {
            anyhow::bail!("recorder configured to fail");
        }
        Ok(())
    }
}
