use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;

use crate::error::{DecodeError, Result};
use crate::parser::explodes::ss::decode_body;
use crate::utils::base64::decode_url_safe_lenient;
use crate::utils::http::{web_get_ok, ProxyConfig};
use crate::utils::url::url_decode;

/// Remarks of the pseudo nodes carrying the official site link.
const OFFICIAL_SITE_HINT: &str = "官网";
/// Providers publish quota and expiry as pseudo nodes pointing here.
const INFO_NODE_SERVER: &str = "www.google.com";

lazy_static! {
    /// `server:port:protocol:method:obfs:password[/?query]`, the server may
    /// itself contain colons (IPv6).
    static ref SSR_PAYLOAD: Regex =
        Regex::new(r"^(.+):([^:]*):([^:]*):([^:]*):([^:]*):([^:/?]*)/?(?:\?(.*))?$").unwrap();
}

/// A decoded `ssr://` line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SsrItem {
    pub server: String,
    pub port: u16,
    pub protocol: String,
    pub method: String,
    pub obfs: String,
    pub password: String,
    pub obfs_param: String,
    pub protocol_param: String,
    pub remarks: String,
    pub group: String,
}

/// Parse one `ssr://` link.
///
/// Unlike `ss://`, any mismatch is an error for the line.
///
/// # Arguments
/// * `link` - One subscription line: `ssr://` followed by the base64 of
///   `server:port:protocol:method:obfs:base64(password)/?params`
///
/// # Returns
/// * The decoded item, with `obfsparam`, `protoparam`, `remarks` and
///   `group` base64-decoded
/// * `DecodeError::Base64`, `Pattern` or `Port` when the payload is malformed
pub fn explode_ssr(link: &str) -> Result<SsrItem, DecodeError> {
    let encoded = link
        .trim()
        .strip_prefix("ssr://")
        .ok_or_else(|| DecodeError::Pattern {
            scheme: "ssr",
            payload: link.to_string(),
        })?;

    let decoded = decode_url_safe_lenient(encoded)?;
    parse_ssr_payload(decoded.trim())
}

/// Parse the decoded payload of a link.
pub fn parse_ssr_payload(payload: &str) -> Result<SsrItem, DecodeError> {
    let caps = SSR_PAYLOAD
        .captures(payload)
        .ok_or_else(|| DecodeError::Pattern {
            scheme: "ssr",
            payload: payload.to_string(),
        })?;

    let port = caps[2]
        .parse::<u16>()
        .map_err(|_| DecodeError::Port(caps[2].to_string()))?;

    let mut item = SsrItem {
        server: caps[1].to_string(),
        port,
        protocol: caps[3].to_string(),
        method: caps[4].to_string(),
        obfs: caps[5].to_string(),
        password: decode_url_safe_lenient(&caps[6])?,
        ..Default::default()
    };

    if let Some(query) = caps.get(7) {
        apply_params(query.as_str(), &mut item)?;
    }

    Ok(item)
}

/// Every query value is base64url encoded once more.
fn apply_params(query: &str, item: &mut SsrItem) -> Result<(), DecodeError> {
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| DecodeError::Query(pair.to_string()))?;
        let slot = match key {
            "obfsparam" => &mut item.obfs_param,
            "protoparam" => &mut item.protocol_param,
            "remarks" => &mut item.remarks,
            "group" => &mut item.group,
            _ => continue,
        };
        *slot = decode_url_safe_lenient(&url_decode(value))?;
    }
    Ok(())
}

/// Decode a whole `ssr://` subscription body.
///
/// Lines that fail to decode are skipped; the batch only fails when no
/// line decodes at all.
pub fn explode_ssr_sub(body: &[u8]) -> Result<Vec<SsrItem>, DecodeError> {
    let text = decode_body(body)?;

    let mut lines = 0;
    let mut items = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| l.starts_with("ssr://")) {
        lines += 1;
        match explode_ssr(line) {
            Ok(item) => items.push(item),
            Err(e) => warn!("skipping ssr line: {}", e),
        }
    }

    if items.is_empty() {
        return Err(DecodeError::NoValidNodes { lines });
    }
    Ok(items)
}

/// Items whose remarks contain `keyword`.
pub fn search<'a>(items: &'a [SsrItem], keyword: &str) -> Vec<&'a SsrItem> {
    items
        .iter()
        .filter(|item| item.remarks.contains(keyword))
        .collect()
}

/// Remarks of the provider's info pseudo nodes (remaining data, expiry),
/// one per line.
pub fn info_remarks(items: &[SsrItem]) -> String {
    items
        .iter()
        .filter(|item| item.server == INFO_NODE_SERVER && !item.remarks.contains(OFFICIAL_SITE_HINT))
        .map(|item| format!("{}\n", item.remarks))
        .collect()
}

/// Fetch a `ssr://` subscription and return its info remarks.
pub fn fetch_remaining_data_ssr(link: &str, proxy_config: &ProxyConfig) -> Result<String> {
    let response = web_get_ok(link, proxy_config)?;
    let items = explode_ssr_sub(&response.body)?;
    debug!("{} ssr items from {}", items.len(), link);
    Ok(info_remarks(&items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::base64::{encode, Base64Variant};

    fn b64(text: &str) -> String {
        encode(text, Base64Variant::UrlSafeRaw)
    }

    fn to_link(item: &SsrItem) -> String {
        let payload = format!(
            "{}:{}:{}:{}:{}:{}/?obfsparam={}&protoparam={}&remarks={}&group={}",
            item.server,
            item.port,
            item.protocol,
            item.method,
            item.obfs,
            b64(&item.password),
            b64(&item.obfs_param),
            b64(&item.protocol_param),
            b64(&item.remarks),
            b64(&item.group),
        );
        format!("ssr://{}", b64(&payload))
    }

    fn sample() -> SsrItem {
        SsrItem {
            server: "hk.example.com".to_string(),
            port: 10086,
            protocol: "auth_aes128_md5".to_string(),
            method: "chacha20".to_string(),
            obfs: "tls1.2_ticket_auth".to_string(),
            password: "s3cr?t".to_string(),
            obfs_param: "cdn.example.com".to_string(),
            protocol_param: "1234:abcd".to_string(),
            remarks: "香港 01 HK".to_string(),
            group: "Demo".to_string(),
        }
    }

    #[test]
    fn test_decode_is_idempotent() {
        let link = to_link(&sample());
        let first = explode_ssr(&link).unwrap();
        let second = explode_ssr(&link).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, sample());
        // decoding what was re-encoded gives the same struct back
        assert_eq!(explode_ssr(&to_link(&first)).unwrap(), first);
    }

    #[test]
    fn test_payload_without_query() {
        let item = parse_ssr_payload(&format!("1.2.3.4:443:origin:aes-256-cfb:plain:{}", b64("pw")))
            .unwrap();
        assert_eq!(item.server, "1.2.3.4");
        assert_eq!(item.port, 443);
        assert_eq!(item.password, "pw");
        assert!(item.remarks.is_empty());
    }

    #[test]
    fn test_ipv6_server() {
        let item =
            parse_ssr_payload(&format!("2001:db8::1:443:origin:none:plain:{}/?", b64("pw"))).unwrap();
        assert_eq!(item.server, "2001:db8::1");
        assert_eq!(item.port, 443);
    }

    #[test]
    fn test_line_errors() {
        assert!(matches!(
            parse_ssr_payload("1.2.3.4:443:origin"),
            Err(DecodeError::Pattern { scheme: "ssr", .. })
        ));
        assert_eq!(
            parse_ssr_payload(&format!("1.2.3.4:http:origin:none:plain:{}", b64("pw"))),
            Err(DecodeError::Port("http".to_string()))
        );
        assert!(matches!(
            parse_ssr_payload(&format!("1.2.3.4:443:origin:none:plain:{}/?remarks=%%%", b64("pw"))),
            Err(DecodeError::Base64 { .. })
        ));
    }

    #[test]
    fn test_subscription_skips_bad_lines() {
        let info = SsrItem {
            server: "www.google.com".to_string(),
            port: 1,
            remarks: "剩余流量：42GB".to_string(),
            ..sample()
        };
        let lines = format!("{}\nssr://%%%\n{}\n", to_link(&sample()), to_link(&info));
        let body = encode(lines, Base64Variant::Standard);
        let items = explode_ssr_sub(body.as_bytes()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(search(&items, "HK").len(), 1);
        assert_eq!(info_remarks(&items), "剩余流量：42GB\n");

        let body = encode("ssr://%%%\n", Base64Variant::Standard);
        assert_eq!(
            explode_ssr_sub(body.as_bytes()).unwrap_err(),
            DecodeError::NoValidNodes { lines: 1 }
        );
    }

    #[test]
    fn test_info_remarks_skip_official_site() {
        let items = vec![
            SsrItem {
                server: "www.google.com".to_string(),
                remarks: "官网 example.com".to_string(),
                ..Default::default()
            },
            SsrItem {
                server: "www.google.com".to_string(),
                remarks: "过期时间：2026-12-31".to_string(),
                ..Default::default()
            },
        ];
        assert_eq!(info_remarks(&items), "过期时间：2026-12-31\n");
    }
}
