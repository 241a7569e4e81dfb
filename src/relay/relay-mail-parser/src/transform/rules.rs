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

/// One entry of the header rewriting configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderRule {
    /// `name: value` is added to the header block.
    Append {
        ///
        name: String,
        ///
        value: String,
    },
    /// Every `name` header is removed, configured as `-name`.
    Remove {
        ///
        name: String,
    },
    /// `name: value` is added only if the block has no `name` header, configured as `?name`.
    Upsert {
        ///
        name: String,
        ///
        value: String,
    },
}

impl HeaderRule {
    /// Name of the header targeted by the rule.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Append { name, .. } | Self::Remove { name } | Self::Upsert { name, .. } => name,
        }
    }

    fn key(&self) -> String {
        match self {
            Self::Append { name, .. } => name.clone(),
            Self::Remove { name } => format!("-{name}"),
            Self::Upsert { name, .. } => format!("?{name}"),
        }
    }

    fn parse<E: serde::de::Error>(key: &str, value: Option<String>) -> Result<Self, E> {
        let (kind, name) = match key.as_bytes().first() {
            Some(b'-') => ('-', &key[1..]),
            Some(b'?') => ('?', &key[1..]),
            _ => (' ', key),
        };

        if name.is_empty() || name.contains(|c: char| c == ':' || c.is_whitespace()) {
            return Err(E::custom(format!("invalid header name {key:?}")));
        }
        let name = name.to_string();

        let required = || value.ok_or_else(|| E::custom(format!("header {key:?} needs a value")));
        Ok(match kind {
            '-' => Self::Remove { name },
            '?' => Self::Upsert {
                name,
                value: required()?,
            },
            _ => Self::Append {
                name,
                value: required()?,
            },
        })
    }
}

/// Ordered header rewriting rules, configured as a map `header-spec -> value`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HeaderRules(Vec<HeaderRule>);

impl HeaderRules {
    ///
    #[must_use]
    pub fn new(rules: Vec<HeaderRule>) -> Self {
        Self(rules)
    }

    ///
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    ///
    pub fn iter(&self) -> impl Iterator<Item = &HeaderRule> {
        self.0.iter()
    }
}

impl serde::Serialize for HeaderRules {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for rule in &self.0 {
            match rule {
                HeaderRule::Append { value, .. } | HeaderRule::Upsert { value, .. } => {
                    map.serialize_entry(&rule.key(), value)?;
                }
                HeaderRule::Remove { .. } => map.serialize_entry(&rule.key(), "")?,
            }
        }
        map.end()
    }
}

impl<'de> serde::Deserialize<'de> for HeaderRules {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct RulesVisitor;

        impl<'de> serde::de::Visitor<'de> for RulesVisitor {
            type Value = HeaderRules;

            fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                formatter.write_str("a map of header names (optionally prefixed by `-` or `?`) to values")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                let mut rules = Vec::with_capacity(map.size_hint().unwrap_or_default());

                while let Some(key) = map.next_key::<String>()? {
                    let rule = if key.starts_with('-') {
                        map.next_value::<serde::de::IgnoredAny>()?;
                        HeaderRule::parse(&key, None)?
                    } else {
                        HeaderRule::parse(&key, Some(map.next_value::<String>()?))?
                    };
                    rules.push(rule);
                }

                Ok(HeaderRules(rules))
            }
        }

        deserializer.deserialize_map(RulesVisitor)
    }
}
