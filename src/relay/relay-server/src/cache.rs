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

use relay_mail_parser::{HeaderRules, HeaderTransform, TransformError};
use relay_protocol::Error;
use tokio::io::AsyncWriteExt;
use tokio_stream::StreamExt;

/// Failure while writing the body of a message.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The message is larger than the limit.
    #[error("message size exceeded: expected at most {expected} bytes but got {got}")]
    Size {
        ///
        expected: usize,
        ///
        got: usize,
    },
    /// The header block could not be rewritten.
    #[error(transparent)]
    Transform(#[from] TransformError),
    /// Error on the connection or on the file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<Error> for CacheError {
    fn from(value: Error) -> Self {
        match value {
            Error::BufferTooLong { expected, got } => Self::Size { expected, got },
            Error::Io(io) => Self::Io(io),
        }
    }
}

/// The file holding the body of the message being received.
///
/// The body is written to a uniquely named `.part` file next to `path` and
/// moved to `path` once complete. An existing file at `path` is never replaced.
#[derive(Debug)]
pub struct BodyCache {
    path: std::path::PathBuf,
}

impl BodyCache {
    ///
    #[must_use]
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the complete body.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Drain `stream` into the cache, rewriting the header block with `rules`.
    ///
    /// The stream is always consumed up to its end, so the connection stays
    /// in sync with the client even when the message is dropped.
    ///
    /// # Errors
    ///
    /// * the stream produced an error (size exceeded or io)
    /// * the header block cannot be rewritten
    /// * the file cannot be written, or `path` already exists
    pub async fn write(
        &self,
        mut stream: impl tokio_stream::Stream<Item = Result<Vec<u8>, Error>> + Send + Unpin,
        rules: &HeaderRules,
    ) -> Result<(), CacheError> {
        let (mut file, partial) = match self.create().await {
            Ok(created) => created,
            Err(error) => {
                while stream.next().await.is_some() {}
                return Err(error.into());
            }
        };

        let mut transform = HeaderTransform::new(rules);
        let mut out = Vec::with_capacity(1024);
        let mut fault = None;

        while let Some(line) = stream.next().await {
            if fault.is_some() {
                continue;
            }

            let written = match line {
                Ok(line) => match transform.push(&line, &mut out) {
                    Ok(()) => file.write_all(&out).await.map_err(CacheError::from),
                    Err(error) => Err(error.into()),
                },
                Err(error) => Err(error.into()),
            };
            out.clear();

            if let Err(error) = written {
                fault = Some(error);
            }
        }

        if let Some(fault) = fault {
            // dropping `partial` removes the file
            return Err(fault);
        }

        transform.finish(&mut out);
        Self::complete(&mut file, &out).await?;
        drop(file);

        partial
            .persist_noclobber(&self.path)
            .map_err(|error| error.error)?;
        tracing::debug!(path = %self.path.display(), "Message body cached.");
        Ok(())
    }

    async fn create(&self) -> std::io::Result<(tokio::fs::File, tempfile::TempPath)> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                tokio::fs::create_dir_all(parent).await?;
                parent
            }
            _ => std::path::Path::new("."),
        };

        let (file, partial) = tempfile::Builder::new()
            .prefix(".")
            .suffix(".part")
            .tempfile_in(parent)?
            .into_parts();

        Ok((tokio::fs::File::from_std(file), partial))
    }

    async fn complete(file: &mut tokio::fs::File, tail: &[u8]) -> std::io::Result<()> {
        file.write_all(tail).await?;
        file.flush().await?;
        file.sync_all().await
    }

    /// Remove the complete body.
    pub async fn remove(&self) {
        if let Err(error) = tokio::fs::remove_file(&self.path).await {
            tracing::warn!(path = %self.path.display(), %error, "Failed to remove cached body.");
        }
    }
}
