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

/// List of supported SASL Mechanism
/// See <https://www.iana.org/assignments/sasl-mechanisms/sasl-mechanisms.xhtml>
#[derive(
    Debug,
    PartialEq,
    Eq,
    Copy,
    Clone,
    Hash,
    PartialOrd,
    Ord,
    strum::EnumIter,
    strum::Display,
    strum::EnumString,
    serde_with::SerializeDisplay,
    serde_with::DeserializeFromStr,
)]
#[strum(serialize_all = "SCREAMING-KEBAB-CASE", ascii_case_insensitive)]
pub enum Mechanism {
    /// Common, but for interoperability
    Plain,
    /// Obsolete
    Login,
    /// Common
    /// See <https://datatracker.ietf.org/doc/html/rfc4505>
    Anonymous,
}

impl Mechanism {
    /// Does the client must send data first with the challenge
    #[must_use]
    pub const fn client_first(self) -> bool {
        match self {
            Self::Plain | Self::Anonymous => true,
            Self::Login => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Mechanism;

    #[rstest::rstest]
    #[case("PLAIN", Mechanism::Plain)]
    #[case("LOGIN", Mechanism::Login)]
    #[case("ANONYMOUS", Mechanism::Anonymous)]
    fn parse(#[case] input: &str, #[case] expected: Mechanism) {
        pretty_assertions::assert_eq!(input.parse::<Mechanism>().unwrap(), expected);
        pretty_assertions::assert_eq!(expected.to_string(), input);
    }

    #[test]
    fn case_insensitive() {
        pretty_assertions::assert_eq!("plain".parse::<Mechanism>().unwrap(), Mechanism::Plain);
    }

    #[test]
    fn unsupported() {
        assert!("CRAM-MD5".parse::<Mechanism>().is_err());
        assert!("XOAUTH2".parse::<Mechanism>().is_err());
    }
}
