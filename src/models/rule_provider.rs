use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::token::wire_token_enum;

wire_token_enum! {
    pub enum ProviderKind {
        Http => "http",
        File => "file",
        Inline => "inline",
    }
}

wire_token_enum! {
    /// How the client interprets the provider's payload.
    #[derive(Default)]
    pub enum RuleBehavior {
        /// Domain list
        Domain => "domain",
        /// CIDR list
        IpCidr => "ipcidr",
        /// Full rule lines
        #[default]
        Classical => "classical",
    }
}

/// An external rule source, declared here and fetched by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleProvider {
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    #[serde(default)]
    pub behavior: RuleBehavior,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl RuleProvider {
    pub fn http(url: String, path: String, interval_secs: u32, behavior: RuleBehavior) -> Self {
        RuleProvider {
            kind: ProviderKind::Http,
            behavior,
            url: Some(url),
            path: Some(path),
            interval: Some(interval_secs),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_behavior(mut self, behavior: RuleBehavior) -> Self {
        self.behavior = behavior;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_behavior_tokens() {
        let provider = RuleProvider::http(
            "https://example.com/cncidr.txt".to_string(),
            "./ruleset/cncidr.yaml".to_string(),
            86400,
            RuleBehavior::IpCidr,
        );
        let out = serde_yaml::to_string(&provider).unwrap();
        assert!(out.contains("type: http"));
        assert!(out.contains("behavior: ipcidr"));
        assert!(out.contains("interval: 86400"));
    }

    #[test]
    fn test_behavior_defaults_to_classical() {
        let provider: RuleProvider =
            serde_yaml::from_str("type: file\npath: ./rules/local.yaml\n").unwrap();
        assert_eq!(provider.kind, ProviderKind::File);
        assert_eq!(provider.behavior, RuleBehavior::Classical);
        assert_eq!(provider.url, None);
    }
}
