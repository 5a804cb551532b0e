use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::token::wire_token_enum;

/// Built-in policy that routes traffic directly.
pub const DIRECT: &str = "DIRECT";
/// Built-in policy that drops traffic.
pub const REJECT: &str = "REJECT";

/// Policy names clients resolve without a declaration.
pub const LITERAL_POLICIES: &[&str] = &[DIRECT, REJECT, "REJECT-DROP", "PASS", "COMPATIBLE"];

/// Health check target for latency-probe groups
pub const DEFAULT_TEST_URL: &str = "http://www.gstatic.com/generate_204";

wire_token_enum! {
    /// Type of proxy group
    pub enum GroupType {
        Select => "select",
        UrlTest => "url-test",
        Fallback => "fallback",
        LoadBalance => "load-balance",
        Relay => "relay",
    }
}

/// A named routing bucket.
///
/// `proxies` holds member references: node names, other group names or
/// one of the [`LITERAL_POLICIES`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyGroup {
    pub name: String,
    #[serde(rename = "type")]
    pub group_type: GroupType,
    #[serde(rename = "use", default, skip_serializing_if = "Vec::is_empty")]
    pub use_providers: Vec<String>,
    #[serde(default)]
    pub proxies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lazy: Option<bool>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl ProxyGroup {
    pub fn new(name: impl Into<String>, group_type: GroupType) -> Self {
        ProxyGroup {
            name: name.into(),
            group_type,
            use_providers: Vec::new(),
            proxies: Vec::new(),
            url: None,
            interval: None,
            tolerance: None,
            lazy: None,
            extra: BTreeMap::new(),
        }
    }

    /// Manual selection group.
    pub fn select<I, S>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut group = Self::new(name, GroupType::Select);
        group.proxies = members.into_iter().map(Into::into).collect();
        group
    }

    /// Latency-probe group that picks the fastest member.
    pub fn url_test<I, S>(name: impl Into<String>, interval_secs: u32, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut group = Self::select(name, members);
        group.group_type = GroupType::UrlTest;
        group.url = Some(DEFAULT_TEST_URL.to_string());
        group.interval = Some(interval_secs);
        group
    }

    pub fn contains(&self, member: &str) -> bool {
        self.proxies.iter().any(|m| m == member)
    }

    /// Get string representation of the group type
    pub fn type_str(&self) -> &str {
        self.group_type.as_str()
    }
}

/// Whether `name` is a policy that needs no declaration.
pub fn is_literal_policy(name: &str) -> bool {
    LITERAL_POLICIES.contains(&name)
}
