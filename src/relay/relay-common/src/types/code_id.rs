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

/// Identifier of the replies the relay can send; the text of each one
/// is customizable in the configuration.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Deserialize,
    serde::Serialize,
    strum::EnumString,
    strum::EnumVariantNames,
    strum::Display,
    strum::EnumIter,
)]
#[strum(serialize_all = "PascalCase")]
#[serde(rename_all = "PascalCase")]
#[must_use]
pub enum CodeID {
    //
    // Specials Messages
    //
    /// Sent when a flow admits the connection.
    Greetings,
    ///
    Help,
    ///
    Closing,
    ///
    Helo,
    /// Generated from the server name and the authentication mechanisms.
    Ehlo,
    ///
    DataStart,
    //
    // SessionStatus
    //
    /// Sender or recipient admitted, or message handed to the flows.
    Ok,
    /// No flow is left for the sender, the recipient or the message.
    Refused,
    /// No flow admits the connection, the client is disconnected.
    ConnectionRefused,
    /// The body could not be cached, the client may retry later.
    Failure,
    //
    // Parsing Command
    //
    ///
    UnrecognizedCommand,
    ///
    SyntaxErrorParams,
    /// `VRFY`, `EXPN` and `TURN`.
    Unimplemented,
    ///
    BadSequence,
    /// The body is larger than `server.message_size_limit`.
    MessageSizeExceeded,
    //
    // Auth extension
    //
    ///
    AuthSucceeded,
    ///
    AuthMechNotSupported,
    /// No flow is left after the authentication filters voted.
    AuthInvalidCredentials,
    ///
    AuthClientCanceled,
    ///
    AuthErrorDecode64,
    ///
    AuthAlreadyDone,
    //
    // Security mechanism
    //
    /// `server.client_count_max` clients are already served.
    ConnectionMaxReached,
    /// `server.smtp.error.hard_count` errors were sent, the client is disconnected.
    TooManyError,
    /// The client stayed silent longer than `server.smtp.timeout_client`.
    Timeout,
    /// The envelope already holds `server.smtp.rcpt_count_max` recipients.
    TooManyRecipients,
}
