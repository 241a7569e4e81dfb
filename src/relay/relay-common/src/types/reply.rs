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

use crate::ReplyCode;

/// SMTP message send by the server to the client as defined in RFC5321#4.2
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    code: ReplyCode,
    text: Vec<String>,
    folded: String,
}

impl serde::Serialize for Reply {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.folded)
    }
}

impl<'de> serde::Deserialize<'de> for Reply {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct ReplyVisitor;

        impl<'de> serde::de::Visitor<'de> for ReplyVisitor {
            type Value = Reply;

            fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                formatter.write_str("a reply string or a map with `code`, `enhanced` and `text`")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                <Reply as std::str::FromStr>::from_str(v).map_err(serde::de::Error::custom)
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                #[derive(serde::Deserialize)]
                #[serde(field_identifier, rename_all = "lowercase")]
                enum Field {
                    Code,
                    Enhanced,
                    Text,
                }

                let mut text: Option<String> = None;
                let mut code = None;
                let mut enhanced = None;

                while let Some(key) = map.next_key()? {
                    match key {
                        Field::Code => {
                            if code.is_some() {
                                return Err(serde::de::Error::duplicate_field("code"));
                            }
                            code = Some(map.next_value()?);
                        }
                        Field::Text => {
                            if text.is_some() {
                                return Err(serde::de::Error::duplicate_field("text"));
                            }
                            text = Some(map.next_value()?);
                        }
                        Field::Enhanced => {
                            if enhanced.is_some() {
                                return Err(serde::de::Error::duplicate_field("enhanced"));
                            }
                            enhanced = Some(map.next_value()?);
                        }
                    }
                }
                let code = code.ok_or_else(|| serde::de::Error::missing_field("code"))?;

                Ok(Reply::new(
                    enhanced.map_or(ReplyCode::Code { code }, |enhanced| {
                        ReplyCode::Enhanced { code, enhanced }
                    }),
                    text.ok_or_else(|| serde::de::Error::missing_field("text"))?,
                ))
            }
        }

        deserializer.deserialize_any(ReplyVisitor)
    }
}

impl Reply {
    /// Create a single line reply.
    pub fn new(code: ReplyCode, text: impl Into<String>) -> Self {
        let reply = Self {
            code,
            text: vec![text.into()],
            folded: String::new(),
        };
        Self {
            folded: reply.fold(),
            ..reply
        }
    }

    /// Create a multi-line reply, each element of `text` being one line.
    pub fn new_multiline(code: ReplyCode, text: Vec<String>) -> Self {
        let reply = Self {
            code,
            text: if text.is_empty() {
                vec![String::new()]
            } else {
                text
            },
            folded: String::new(),
        };
        Self {
            folded: reply.fold(),
            ..reply
        }
    }

    ///
    #[must_use]
    pub const fn code(&self) -> &ReplyCode {
        &self.code
    }

    /// Lines of text of the reply, without the code.
    #[must_use]
    pub fn text(&self) -> &[String] {
        &self.text
    }

    fn fold(&self) -> String {
        let prefix = self.code.to_string();
        let last = self.text.len().saturating_sub(1);

        self.text
            .iter()
            .enumerate()
            .map(|(idx, line)| {
                let mut out = format!("{prefix} {line}");
                if idx != last {
                    out.replace_range(3..4, "-");
                }
                out.push_str("\r\n");
                out
            })
            .collect::<String>()
    }

    /// Replace every `{key}` in the text of the reply by its value.
    pub fn format(&self, values: &[(&str, &str)]) -> Self {
        let text = self
            .text
            .iter()
            .map(|line| {
                values.iter().fold(line.clone(), |line, (key, value)| {
                    line.replace(&format!("{{{key}}}"), value)
                })
            })
            .collect();
        Self::new_multiline(self.code.clone(), text)
    }

    /// Create a new reply with:
    /// * `text` = `self.text` + `other.text`
    /// * `code` = `other.code`
    /// ```
    /// # use relay_common::Reply;
    /// let first = "250 mydomain.tld".parse::<Reply>().unwrap();
    /// let second = "250 8BITMIME".parse::<Reply>().unwrap();
    ///
    /// assert_eq!(
    ///   first.extended(&second).to_string(),
    ///   [
    ///     "250-mydomain.tld\r\n",
    ///     "250 8BITMIME\r\n"
    ///   ].concat()
    /// );
    /// ```
    pub fn extended(mut self, other: &Self) -> Self {
        self.text.extend(other.text.iter().cloned());
        Self::new_multiline(other.code.clone(), self.text)
    }
}

impl std::str::FromStr for Reply {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut first_code = None;
        let mut text = vec![];

        for x in s
            .split("\r\n")
            .filter(|s| !s.is_empty())
            .map(ReplyCode::from_str)
        {
            let (new_code, mut line) = x?;

            match (&first_code, new_code) {
                (Some(first), new) if *first == new => {}
                (Some(_), _) => anyhow::bail!("Reply codes are not consistent"),
                (None, anything) => first_code = Some(anything),
            }

            if !line.is_empty() {
                let c = line.remove(0);
                if !" -".contains(c) {
                    anyhow::bail!("unexpected separator {c:?} in {s:?}");
                }
            }
            text.push(line);
        }

        Ok(Self::new_multiline(
            first_code.ok_or_else(|| anyhow::anyhow!("empty reply"))?,
            text,
        ))
    }
}

impl std::fmt::Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.folded)
    }
}

impl AsRef<str> for Reply {
    fn as_ref(&self) -> &str {
        &self.folded
    }
}

#[cfg(test)]
mod tests {
    use crate::{Reply, ReplyCode};

    #[rstest::rstest]
    #[case("501 \r\n", ReplyCode::Code { code: 501 }, &[""])]
    #[case("220 this is a custom code.\r\n", ReplyCode::Code { code: 220 }, &["this is a custom code."])]
    #[case(
        "451 5.7.3 STARTTLS is required to send mail\r\n",
        ReplyCode::Enhanced { code: 451, enhanced: "5.7.3".to_string() },
        &["STARTTLS is required to send mail"]
    )]
    #[case(
        "250-relay.tld\r\n250-8BITMIME\r\n250 AUTH PLAIN LOGIN\r\n",
        ReplyCode::Code { code: 250 },
        &["relay.tld", "8BITMIME", "AUTH PLAIN LOGIN"]
    )]
    fn parse(#[case] input: &str, #[case] code: ReplyCode, #[case] text: &[&str]) {
        let reply = input.parse::<Reply>().unwrap();
        pretty_assertions::assert_eq!(*reply.code(), code);
        pretty_assertions::assert_eq!(reply.text(), text);
        pretty_assertions::assert_eq!(reply.to_string(), input);
    }

    #[test]
    fn inconsistent_codes() {
        assert!("250-foo\r\n251 bar\r\n".parse::<Reply>().is_err());
        assert!("".parse::<Reply>().is_err());
    }

    #[test]
    fn format_placeholder() {
        let reply = Reply::new(ReplyCode::Code { code: 220 }, "{name} Service ready");
        pretty_assertions::assert_eq!(
            reply.format(&[("name", "relay.tld")]).to_string(),
            "220 relay.tld Service ready\r\n"
        );
    }

    #[test]
    fn deserialize_map() {
        let reply = serde_json::from_str::<Reply>(
            r#"{ "code": 535, "enhanced": "5.7.8", "text": "Authentication credentials invalid" }"#,
        )
        .unwrap();
        pretty_assertions::assert_eq!(
            reply.to_string(),
            "535 5.7.8 Authentication credentials invalid\r\n"
        );
    }
}
