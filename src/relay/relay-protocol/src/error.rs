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

/// Error while reading the commands or the body of a client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A command line or the body went past its size limit. The rest of a
    /// body is still consumed up to the final dot.
    #[error("buffer is not supposed to be longer than {expected} bytes but got {got}")]
    BufferTooLong {
        /// The limit.
        expected: usize,
        /// Bytes received when it was passed.
        got: usize,
    },
    /// The connection failed or timed out.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}
