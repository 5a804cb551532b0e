//! The clash configuration document
//!
//! Used both for decoding a remote structured subscription and for the
//! output of a conversion. See https://github.com/Dreamacro/clash/wiki/configuration

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::token::wire_token_enum;
use super::{Node, ProxyGroup, Rule, RuleProvider};

wire_token_enum! {
    /// Router working mode
    pub enum Mode {
        Rule => "rule",
        Global => "global",
        Direct => "direct",
    }
}

wire_token_enum! {
    pub enum LogLevel {
        Debug => "debug",
        Info => "info",
        Warning => "warning",
        Error => "error",
        Silent => "silent",
    }
}

wire_token_enum! {
    pub enum EnhancedMode {
        FakeIp => "fake-ip",
        RedirHost => "redir-host",
        Normal => "normal",
    }
}

/// Value of a static `hosts` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostTarget {
    One(String),
    Many(Vec<String>),
}

impl From<&str> for HostTarget {
    fn from(ip: &str) -> Self {
        HostTarget::One(ip.to_string())
    }
}

/// Static DNS records, wildcards allowed (`*.example.com`).
pub type DnsMapping = BTreeMap<String, HostTarget>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Profile {
    #[serde(default)]
    pub tracing: bool,
    /// Remember `select` choices between restarts
    #[serde(default)]
    pub store_selected: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DnsSetting {
    #[serde(default)]
    pub enable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhanced_mode: Option<EnhancedMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fake_ip_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nameserver: Vec<String>,
    /// When false, AAAA questions get an empty answer
    #[serde(default)]
    pub ipv6: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// A complete clash configuration.
///
/// One value is built per conversion request and exclusively owns its
/// proxies, groups, rules and rule providers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Configuration {
    /// HTTP(S) proxy port on the local end
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socks_port: Option<u16>,
    /// HTTP(S) and SOCKS on the same port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mixed_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redir_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authentication: Vec<String>,
    #[serde(default)]
    pub allow_lan: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,
    /// RESTful API listening address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_controller: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hosts: DnsMapping,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<DnsSetting>,

    #[serde(default)]
    pub proxies: Vec<Node>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub proxy_providers: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    pub proxy_groups: Vec<ProxyGroup>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub rule_providers: BTreeMap<String, RuleProvider>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl Configuration {
    /// A fresh shell carrying the local connection settings and no
    /// proxies, groups or rules.
    pub fn local_defaults() -> Self {
        Configuration {
            mixed_port: Some(7890),
            external_controller: Some("0.0.0.0:9090".to_string()),
            allow_lan: true,
            mode: Some(Mode::Rule),
            log_level: Some(LogLevel::Info),
            profile: Some(Profile {
                tracing: true,
                store_selected: true,
                extra: BTreeMap::new(),
            }),
            dns: Some(DnsSetting {
                enable: true,
                enhanced_mode: Some(EnhancedMode::FakeIp),
                fake_ip_range: Some("198.19.0.1/16".to_string()),
                listen: Some("0.0.0.0:53".to_string()),
                nameserver: vec![
                    "223.5.5.5".to_string(),
                    "8.8.8.8".to_string(),
                    "114.114.114.114".to_string(),
                ],
                ipv6: true,
                extra: BTreeMap::new(),
            }),
            ..Default::default()
        }
    }

    pub fn group(&self, name: &str) -> Option<&ProxyGroup> {
        self.proxy_groups.iter().find(|g| g.name == name)
    }

    pub fn proxy(&self, name: &str) -> Option<&Node> {
        self.proxies.iter().find(|n| n.name == name)
    }

    /// Index of the trailing catch-all rule, if the last rule is one.
    pub fn catch_all_index(&self) -> Option<usize> {
        match self.rules.last() {
            Some(rule) if rule.is_catch_all() => Some(self.rules.len() - 1),
            _ => None,
        }
    }
}
