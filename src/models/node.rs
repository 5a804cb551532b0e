//! Proxy node model
//!
//! The uniform representation every subscription format is decoded into.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use super::token::wire_token_enum;

wire_token_enum! {
    /// Transport type of a node, serialized as the clash `type` token.
    pub enum NodeType {
        Shadowsocks => "ss",
        ShadowsocksR => "ssr",
        Http => "http",
        Socks5 => "socks5",
        VMess => "vmess",
        Vless => "vless",
        Trojan => "trojan",
        Snell => "snell",
        Hysteria => "hysteria",
        Hysteria2 => "hysteria2",
        Tuic => "tuic",
        WireGuard => "wireguard",
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Accepts `port: 443` as well as `port: "443"`.
fn deserialize_port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortRepr {
        Number(u16),
        Text(String),
    }

    match Option::<PortRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(PortRepr::Number(port)) => Ok(Some(port)),
        Some(PortRepr::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(PortRepr::Text(text)) => text
            .trim()
            .parse::<u16>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid port '{}'", text))),
    }
}

/// One proxy endpoint.
///
/// Groups refer to nodes by `name` only, so names must be unique in a
/// configuration. Keys this model does not know about (vmess uuid, ws
/// options, ...) are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Node {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server: String,
    #[serde(
        default,
        deserialize_with = "deserialize_port",
        skip_serializing_if = "Option::is_none"
    )]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cipher: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub protocol: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub protocol_param: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub obfs: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub obfs_param: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub tls: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub skip_cert_verify: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub udp: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub plugin: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub plugin_opts: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub tfo: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Node {
    pub fn new(name: impl Into<String>, node_type: NodeType) -> Self {
        Node {
            name: name.into(),
            node_type,
            server: String::new(),
            port: None,
            cipher: String::new(),
            password: String::new(),
            protocol: String::new(),
            protocol_param: String::new(),
            obfs: String::new(),
            obfs_param: String::new(),
            tls: false,
            skip_cert_verify: false,
            udp: false,
            plugin: String::new(),
            plugin_opts: BTreeMap::new(),
            tfo: false,
            extra: BTreeMap::new(),
        }
    }

    pub fn endpoint(mut self, server: impl Into<String>, port: u16) -> Self {
        self.server = server.into();
        self.port = Some(port);
        self
    }

    pub fn credentials(mut self, cipher: impl Into<String>, password: impl Into<String>) -> Self {
        self.cipher = cipher.into();
        self.password = password.into();
        self
    }

    pub fn udp(mut self, udp: bool) -> Self {
        self.udp = udp;
        self
    }

    pub fn tfo(mut self, tfo: bool) -> Self {
        self.tfo = tfo;
        self
    }

    /// A node is complete once it knows where to connect.
    pub fn is_complete(&self) -> bool {
        !self.server.is_empty() && self.port.is_some()
    }
}
