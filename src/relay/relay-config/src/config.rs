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

use relay_common::{auth::Mechanism, CodeID, Operator, Reply};
use relay_mail_parser::HeaderRules;

/// This structure contains all the field to configure the relay at the startup.
///
/// This structure will be loaded from a configuration file `-c, --config`
/// argument of the program. See [`crate::Config::from_path`].
///
/// All field are optional and defaulted if missing.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// see [`field::FieldServer`]
    #[serde(default)]
    pub server: field::FieldServer,
    /// see [`field::FieldCache`]
    #[serde(default)]
    pub cache: field::FieldCache,
    /// Rewriting rules applied to the header block of every message received.
    #[serde(default)]
    pub headers: HeaderRules,
    /// see [`field::FieldFlows`]
    #[serde(default)]
    pub flows: field::FieldFlows,
}

/// The inner field of the relay's configuration.
#[allow(clippy::module_name_repetitions)]
pub mod field {
    use super::{CodeID, Mechanism, Operator, Reply};

    /// This structure contains all the field to configure the server at the startup.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServer {
        /// Name of the server.
        ///
        /// Used with the response [`CodeID::Greetings`] and [`CodeID::Ehlo`].
        #[serde(default = "FieldServer::default_name")]
        pub name: String,
        /// Maximum number of client served at the same time.
        ///
        /// The client will be rejected if the server is full.
        ///
        /// If this value is `-1`, then the server will accept any number of client.
        #[serde(default = "FieldServer::default_client_count_max")]
        pub client_count_max: i64,
        /// Maximum size in bytes of the message.
        #[serde(default = "FieldServer::default_message_size_limit")]
        pub message_size_limit: usize,
        /// see [`FieldServerInterfaces`]
        #[serde(default)]
        pub interfaces: FieldServerInterfaces,
        /// see [`FieldServerLogs`]
        #[serde(default)]
        pub logs: FieldServerLogs,
        /// see [`FieldServerSMTP`]
        #[serde(default)]
        pub smtp: FieldServerSMTP,
        /// see [`FieldServerDNS`]
        #[serde(default)]
        pub dns: FieldServerDNS,
    }

    /// Resolver used to find the host name of the clients.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(tag = "type", rename_all = "lowercase", deny_unknown_fields)]
    pub enum FieldServerDNS {
        /// No lookup, the clients have no host name.
        None,
        /// Using the resolver of the system (/etc/resolv.conf).
        System,
        /// Using the google DNS resolver.
        Google,
        /// Using the cloudflare DNS resolver.
        CloudFlare,
    }

    /// Address served by the relay. Either ipv4 or ipv6.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerInterfaces {
        /// List of address listened for the protocol SMTP.
        #[serde(default = "FieldServerInterfaces::default_addr")]
        #[serde(deserialize_with = "crate::parser::socket_addr::deserialize")]
        pub addr: Vec<std::net::SocketAddr>,
    }

    /// The field related to the logs.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerLogs {
        /// Filepath of the server's log.
        ///
        /// A daily rolling file will be created at `{filepath}.{YYYY-MM-DD}`.
        #[serde(default = "FieldServerLogs::default_filepath")]
        pub filepath: std::path::PathBuf,
        /// Customize the log level of the different part of the program.
        ///
        /// See <https://docs.rs/tracing-subscriber/0.3.15/tracing_subscriber/filter/struct.EnvFilter.html>
        #[serde(
            default = "FieldServerLogs::default_level",
            serialize_with = "crate::parser::tracing_directive::serialize",
            deserialize_with = "crate::parser::tracing_directive::deserialize"
        )]
        pub level: Vec<tracing_subscriber::filter::Directive>,
    }

    /// Configuration of the client's error handling.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerSMTPError {
        /// The maximum number of errors before the client is delay between each response.
        ///
        /// `-1` to disable
        pub soft_count: i64,
        /// The maximum number of errors before the client is disconnected.
        ///
        /// `-1` to disable
        pub hard_count: i64,
        /// The delay used between each response, after `soft_count` errors.
        #[serde(with = "humantime_serde")]
        pub delay: std::time::Duration,
    }

    /// Configuration of the SMTP authentication.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerSMTPAuth {
        /// List of mechanisms supported by the server, advertised in the EHLO reply.
        #[serde(default = "FieldServerSMTPAuth::default_mechanisms")]
        pub mechanisms: Vec<Mechanism>,
    }

    /// Parameters of the SMTP.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerSMTP {
        /// Maximum number of recipients received in the envelope, extra recipients will be rejected.
        #[serde(default = "FieldServerSMTP::default_rcpt_count_max")]
        pub rcpt_count_max: usize,
        /// SMTP's error policy.
        #[serde(default)]
        pub error: FieldServerSMTPError,
        /// Delay without any command from the client before closing the connection.
        #[serde(with = "humantime_serde")]
        #[serde(default = "FieldServerSMTP::default_timeout_client")]
        pub timeout_client: std::time::Duration,
        /// SMTP's authentication policy.
        #[serde(default)]
        pub auth: FieldServerSMTPAuth,
        /// Dictionary of the reply sent by the server during the SMTP transaction.
        ///
        /// Missing entries are completed with the default replies.
        #[serde(default)]
        pub codes: std::collections::BTreeMap<CodeID, Reply>,
    }

    /// The body cache written between `DATA` and `<CRLF>.<CRLF>`.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldCache {
        /// Path of the file, variables such as `${iso8601}` or `${id}` are substituted.
        #[serde(default = "FieldCache::default_path")]
        pub path: String,
        /// Keep the file once every processor has run.
        #[serde(default)]
        pub keep: bool,
    }

    /// A filter or a processor of a flow.
    ///
    /// Every field other than `type` and `name` is forwarded to the constructor
    /// registered for `type`.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    pub struct FieldComponent {
        /// Tag of the constructor in the registry.
        pub r#type: String,
        /// Name of the instance, unique in the flow, defaulted to `<type>_<index>`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub name: Option<String>,
        /// Parameters specific to the type.
        #[serde(flatten)]
        pub params: serde_json::Map<String, serde_json::Value>,
    }

    impl FieldComponent {
        /// Name of the instance, only available after [`Config::ensure`](crate::Config).
        #[must_use]
        pub fn name(&self) -> &str {
            self.name.as_deref().unwrap_or(&self.r#type)
        }

        /// The parameters as a json object.
        #[must_use]
        pub fn params(&self) -> serde_json::Value {
            serde_json::Value::Object(self.params.clone())
        }
    }

    /// A routing pipeline.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldFlow {
        /// Filters voting on the admission, in order.
        #[serde(default)]
        pub filters: Vec<FieldComponent>,
        /// How the votes of the filters are combined.
        #[serde(default)]
        pub filters_operator: Operator,
        /// Processors run on the messages admitted by the flow, in order.
        #[serde(default)]
        pub outputs: Vec<FieldComponent>,
    }

    /// Flows by name, in the order of the configuration file.
    #[derive(Debug, Default, Clone, PartialEq, Eq)]
    pub struct FieldFlows(pub Vec<(String, FieldFlow)>);

    impl FieldFlows {
        /// Iterate over the flows in configuration order.
        pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldFlow)> {
            self.0.iter().map(|(name, flow)| (name.as_str(), flow))
        }

        /// Get a flow by its name.
        #[must_use]
        pub fn get(&self, name: &str) -> Option<&FieldFlow> {
            self.0.iter().find(|(i, _)| i == name).map(|(_, flow)| flow)
        }

        ///
        #[must_use]
        pub fn len(&self) -> usize {
            self.0.len()
        }

        ///
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.0.is_empty()
        }
    }

    impl serde::Serialize for FieldFlows {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: serde::Serializer,
        {
            let mut map = serializer.serialize_map(Some(self.0.len()))?;
            for (name, flow) in &self.0 {
                serde::ser::SerializeMap::serialize_entry(&mut map, name, flow)?;
            }
            serde::ser::SerializeMap::end(map)
        }
    }

    impl<'de> serde::Deserialize<'de> for FieldFlows {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            struct FlowsVisitor;

            impl<'de> serde::de::Visitor<'de> for FlowsVisitor {
                type Value = FieldFlows;

                fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    formatter.write_str("a map of flow name to flow definition")
                }

                fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
                where
                    A: serde::de::MapAccess<'de>,
                {
                    let mut flows = Vec::<(String, FieldFlow)>::new();
                    while let Some((name, flow)) = map.next_entry::<String, FieldFlow>()? {
                        if flows.iter().any(|(i, _)| *i == name) {
                            return Err(serde::de::Error::custom(format!(
                                "flow `{name}` is defined twice"
                            )));
                        }
                        flows.push((name, flow));
                    }
                    Ok(FieldFlows(flows))
                }
            }

            deserializer.deserialize_map(FlowsVisitor)
        }
    }
}
