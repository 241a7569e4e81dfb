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

use relay_common::Reply;
use tokio::io::AsyncWriteExt;

/// What the receiver does with an error reply once it is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Escalation {
    None,
    Soft,
    Hard,
}

/// Error replies sent on a connection, with the soft and hard thresholds.
///
/// A threshold of `-1` is never reached.
#[derive(Debug)]
pub(crate) struct ErrorCounter {
    count: i64,
    soft: i64,
    hard: i64,
}

impl ErrorCounter {
    pub(crate) const fn new(soft: i64, hard: i64) -> Self {
        Self {
            count: 0,
            soft,
            hard,
        }
    }

    /// Count `reply` if it carries an error code.
    pub(crate) fn record(&mut self, reply: &Reply) -> Escalation {
        if !reply.code().is_error() {
            return Escalation::None;
        }
        self.count += 1;

        let reached = |threshold: i64| threshold != -1 && self.count >= threshold;
        if reached(self.hard) {
            Escalation::Hard
        } else if reached(self.soft) {
            Escalation::Soft
        } else {
            Escalation::None
        }
    }
}

/// Outgoing half of the connection.
pub struct Writer<W: tokio::io::AsyncWrite + Unpin + Send> {
    inner: W,
}

impl<W: tokio::io::AsyncWrite + Unpin + Send> Writer<W> {
    ///
    #[must_use]
    pub const fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write `buffer` and flush it.
    ///
    /// # Errors
    ///
    /// * [`std::io::Error`] produced by the underlying writer
    pub async fn write_all(&mut self, buffer: &str) -> std::io::Result<()> {
        tracing::trace!(">> {:?}", buffer);
        self.inner.write_all(buffer.as_bytes()).await?;
        self.inner.flush().await
    }
}
