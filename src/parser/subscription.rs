//! Subscription entry point: a fetched upstream response in, a
//! [`Configuration`] holding the decoded nodes out.

use std::fmt;
use std::str::FromStr;

use log::{debug, info};

use crate::error::{Error, Result};
pub use crate::models::RemoteResponse;
use crate::models::Configuration;
use crate::parser::explodes::{explode_ss_sub, explode_ssr_sub};
use crate::parser::mapping::{ss_item_to_node, ssr_item_to_node};

pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_SUBSCRIPTION_USERINFO: &str = "Subscription-Userinfo";
pub const HEADER_CONTENT_DISPOSITION: &str = "Content-Disposition";
pub const DEFAULT_CONTENT_TYPE: &str = "application/x-yaml";

/// Wire format of the upstream subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubscriptionType {
    /// Structured clash YAML
    #[default]
    Clash,
    /// base64 list of `ss://` links
    Ss,
    /// base64 list of `ssr://` links
    Ssr,
}

impl SubscriptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionType::Clash => "clash",
            SubscriptionType::Ss => "ss",
            SubscriptionType::Ssr => "ssr",
        }
    }
}

impl FromStr for SubscriptionType {
    type Err = Error;

    /// An empty string means clash.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "clash" => Ok(SubscriptionType::Clash),
            "ss" => Ok(SubscriptionType::Ss),
            "ssr" => Ok(SubscriptionType::Ssr),
            other => Err(Error::Config(format!("unknown subscription type '{}'", other))),
        }
    }
}

impl fmt::Display for SubscriptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decode an upstream response into a configuration.
///
/// For the URI-list formats only `proxies` is filled in; a clash document
/// is read whole.
pub fn decode_subscription(
    response: &RemoteResponse,
    sub_type: SubscriptionType,
) -> Result<Configuration> {
    response.ensure_success()?;

    let config = match sub_type {
        SubscriptionType::Clash => serde_yaml::from_slice::<Configuration>(&response.body)?,
        SubscriptionType::Ss => Configuration {
            proxies: explode_ss_sub(&response.body)?
                .iter()
                .filter_map(ss_item_to_node)
                .collect(),
            ..Default::default()
        },
        SubscriptionType::Ssr => Configuration {
            proxies: explode_ssr_sub(&response.body)?
                .iter()
                .map(ssr_item_to_node)
                .collect(),
            ..Default::default()
        },
    };

    info!(
        "decoded {} subscription: {} proxies",
        sub_type,
        config.proxies.len()
    );
    debug!(
        "{} groups, {} rules in upstream document",
        config.proxy_groups.len(),
        config.rules.len()
    );
    Ok(config)
}

/// How the client should treat the converted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Disposition {
    #[default]
    Inline,
    Attachment,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
        }
    }
}

/// Response headers for serving a converted document.
///
/// `Content-Type` and `Subscription-Userinfo` are forwarded from upstream,
/// the former defaulting to YAML; the disposition names the file after
/// `host`.
pub fn response_headers(
    upstream: &RemoteResponse,
    host: &str,
    disposition: Disposition,
) -> Vec<(&'static str, String)> {
    let mut headers = vec![(
        HEADER_CONTENT_TYPE,
        upstream
            .header(HEADER_CONTENT_TYPE)
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string(),
    )];

    if let Some(userinfo) = upstream.header(HEADER_SUBSCRIPTION_USERINFO) {
        headers.push((HEADER_SUBSCRIPTION_USERINFO, userinfo.to_string()));
    }

    headers.push((
        HEADER_CONTENT_DISPOSITION,
        format!("{};filename={}", disposition.as_str(), host),
    ));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use crate::models::NodeType;
    use crate::utils::base64::{encode, Base64Variant};

    #[test]
    fn test_subscription_type_parse() {
        assert_eq!("".parse::<SubscriptionType>().unwrap(), SubscriptionType::Clash);
        assert_eq!("SSR".parse::<SubscriptionType>().unwrap(), SubscriptionType::Ssr);
        assert!(matches!(
            "vmess".parse::<SubscriptionType>(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_upstream_failure_is_surfaced() {
        let response = RemoteResponse {
            status: 403,
            headers: Vec::new(),
            body: b"forbidden".to_vec(),
        };
        match decode_subscription(&response, SubscriptionType::Clash) {
            Err(Error::UpstreamFetch { status, body }) => {
                assert_eq!(status, 403);
                assert_eq!(body, b"forbidden");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_ss_body() {
        let userinfo = encode("aes-128-gcm:pw", Base64Variant::StandardRaw);
        let body = encode(
            format!("ss://{}@1.2.3.4:8388#HK%2001\nss://%%%#Partial\n", userinfo),
            Base64Variant::Standard,
        );
        let config = decode_subscription(&RemoteResponse::ok(body), SubscriptionType::Ss).unwrap();
        assert_eq!(config.proxies.len(), 2);
        assert_eq!(config.proxies[0].node_type, NodeType::Shadowsocks);
        assert_eq!(config.proxies[0].name, "HK 01");
        assert!(config.proxies[0].is_complete());
        assert!(!config.proxies[1].is_complete());
        assert!(config.rules.is_empty());
    }

    #[test]
    fn test_decode_ss_without_valid_nodes() {
        let body = encode("ss://%%%#A\n", Base64Variant::Standard);
        assert!(matches!(
            decode_subscription(&RemoteResponse::ok(body), SubscriptionType::Ss),
            Err(Error::Decode(DecodeError::NoValidNodes { lines: 1 }))
        ));
    }

    #[test]
    fn test_decode_clash_body() {
        let body = "proxies:\n  - {name: a, type: trojan, server: t.example.com, port: 443, password: x, sni: t.example.com}\nrules:\n  - MATCH,DIRECT\n";
        let config = decode_subscription(&RemoteResponse::ok(body), SubscriptionType::Clash).unwrap();
        assert_eq!(config.proxies[0].node_type, NodeType::Trojan);
        assert!(config.proxies[0].extra.contains_key("sni"));
        assert_eq!(config.rules.len(), 1);
    }

    #[test]
    fn test_decode_clash_body_with_unmodelled_tokens() {
        let body = "log-level: warn\nproxies:\n  - {name: '🇯🇵 JP 01', type: ss, server: jp.example.com, port: 8388, cipher: aes-128-gcm, password: pw}\n  - {name: '🇯🇵 JP 02', type: anytls, server: jp2.example.com, port: 443, password: pw}\n";
        let config = decode_subscription(&RemoteResponse::ok(body), SubscriptionType::Clash).unwrap();
        assert_eq!(config.proxies.len(), 2);
        assert_eq!(config.proxies[1].node_type, NodeType::Other("anytls".to_string()));
        assert!(config.proxies[1].is_complete());
    }

    #[test]
    fn test_response_headers() {
        let upstream = RemoteResponse::ok("")
            .with_header("content-type", "text/plain; charset=utf-8")
            .with_header(
                "subscription-userinfo",
                "upload=1; download=2; total=3; expire=4",
            );
        let headers = response_headers(&upstream, "sub.example.com", Disposition::Attachment);
        assert_eq!(
            headers,
            vec![
                (HEADER_CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                (
                    HEADER_SUBSCRIPTION_USERINFO,
                    "upload=1; download=2; total=3; expire=4".to_string()
                ),
                (
                    HEADER_CONTENT_DISPOSITION,
                    "attachment;filename=sub.example.com".to_string()
                ),
            ]
        );

        let headers = response_headers(&RemoteResponse::ok(""), "h", Disposition::Inline);
        assert_eq!(headers[0].1, DEFAULT_CONTENT_TYPE);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[1].1, "inline;filename=h");
    }
}
