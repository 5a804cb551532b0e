use std::collections::BTreeMap;

use lazy_static::lazy_static;
use log::warn;
use regex::Regex;

use crate::error::DecodeError;
use crate::utils::base64::{self, Base64Variant};
use crate::utils::url::url_decode;

lazy_static! {
    static ref SIP002: Regex = Regex::new(r"^(.*)@(.*):(.*)$").unwrap();
    static ref LEGACY: Regex = Regex::new(r"^(.*?):(.*)@(.*):(.*)$").unwrap();
    static ref METHOD_PASSWORD: Regex = Regex::new(r"^(.*?):(.*)$").unwrap();
}

/// A decoded `ss://` line.
///
/// Fields stay as text: a line that only partially matched still yields an
/// item, with whatever could not be recovered left empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SsItem {
    pub name: String,
    /// SIP003 plugin settings, the plugin id itself under `plugin`
    pub plugins: BTreeMap<String, String>,
    pub server: String,
    pub port: String,
    pub method: String,
    pub password: String,
}

impl SsItem {
    /// Whether the item carries a usable endpoint and cipher.
    pub fn is_complete(&self) -> bool {
        !self.server.is_empty() && self.port_number().is_some() && !self.method.is_empty()
    }

    pub fn port_number(&self) -> Option<u16> {
        self.port.parse::<u16>().ok().filter(|p| *p != 0)
    }
}

/// Parse one `ss://` link.
///
/// Both the SIP002 form (`userinfo@server:port`) and the legacy form (the
/// whole `method:password@server:port` base64 encoded) are accepted.
///
/// # Arguments
/// * `link` - One subscription line, starting with `ss://`
///
/// # Returns
/// * The decoded item. Fields that could not be read are left empty, so
///   the item may be partial (see [`SsItem::is_complete`])
/// * `DecodeError::Pattern` if the link lacks the `ss://` prefix
///
/// # Examples
/// ```
/// use subrewrite::parser::explodes::explode_ss;
///
/// let item = explode_ss("ss://YWVzLTEyOC1nY206cHc@1.2.3.4:8388#HK%2001").unwrap();
/// assert_eq!(item.name, "HK 01");
/// assert_eq!(item.method, "aes-128-gcm");
/// assert_eq!(item.port_number(), Some(8388));
/// ```
pub fn explode_ss(link: &str) -> Result<SsItem, DecodeError> {
    let mut content = link
        .trim()
        .strip_prefix("ss://")
        .ok_or_else(|| DecodeError::Pattern {
            scheme: "ss",
            payload: link.to_string(),
        })?;

    let mut item = SsItem::default();

    if let Some(pos) = content.find('#') {
        item.name = url_decode(&content[pos + 1..]);
        content = &content[..pos];
    }

    if let Some(pos) = content.find("/?") {
        item.plugins = parse_plugins(&content[pos + 2..]);
        content = &content[..pos];
    } else if let Some(pos) = content.find('?') {
        item.plugins = parse_plugins(&content[pos + 1..]);
        content = &content[..pos];
    }
    let content = content.trim_end_matches('/');

    if content.contains('@') {
        let Some(caps) = SIP002.captures(content) else {
            return Ok(item);
        };
        item.server = caps[2].to_string();
        item.port = caps[3].to_string();
        if let Some((method, password)) = decode_userinfo(&caps[1]) {
            item.method = method;
            item.password = password;
        }
        return Ok(item);
    }

    let Ok(decoded) = base64::decode_to_string(content, Base64Variant::Standard) else {
        return Ok(item);
    };
    if let Some(caps) = LEGACY.captures(decoded.trim()) {
        item.method = caps[1].to_string();
        item.password = caps[2].to_string();
        item.server = caps[3].to_string();
        item.port = caps[4].to_string();
    }

    Ok(item)
}

/// `plugin=obfs-local;obfs=http;obfs-host=example.com` into a map.
fn parse_plugins(suffix: &str) -> BTreeMap<String, String> {
    url_decode(suffix)
        .split(';')
        .filter_map(|entry| entry.split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// SIP002 userinfo: base64 (either alphabet) or plain percent-encoded
/// `method:password`, the latter used by AEAD-2022 links.
fn decode_userinfo(userinfo: &str) -> Option<(String, String)> {
    let candidates = [
        base64::decode_to_string(userinfo, Base64Variant::StandardRaw).ok(),
        base64::decode_to_string(userinfo, Base64Variant::UrlSafeRaw).ok(),
        Some(url_decode(userinfo)),
    ];

    candidates.into_iter().flatten().find_map(|text| {
        METHOD_PASSWORD
            .captures(&text)
            .map(|caps| (caps[1].to_string(), caps[2].to_string()))
    })
}

/// Decode a whole `ss://` subscription body.
///
/// The body is a standard-base64 blob of newline separated links; a body
/// that is already plain text is read as is. Partial items are kept, but
/// the batch fails with [`DecodeError::NoValidNodes`] when none of the
/// items is complete.
pub fn explode_ss_sub(body: &[u8]) -> Result<Vec<SsItem>, DecodeError> {
    let text = decode_body(body)?;

    let mut lines = 0;
    let mut items = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| l.starts_with("ss://")) {
        lines += 1;
        match explode_ss(line) {
            Ok(item) => {
                if !item.is_complete() {
                    warn!("partially decoded ss line: {}", line);
                }
                items.push(item);
            }
            Err(e) => warn!("skipping ss line: {}", e),
        }
    }

    if !items.iter().any(SsItem::is_complete) {
        return Err(DecodeError::NoValidNodes { lines });
    }
    Ok(items)
}

/// Removes the outer base64 layer of a URI-list subscription.
pub(crate) fn decode_body(body: &[u8]) -> Result<String, DecodeError> {
    match base64::decode(body, Base64Variant::Standard) {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            let plain = String::from_utf8_lossy(body);
            if plain.contains("://") {
                Ok(plain.into_owned())
            } else {
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sip002_link(method: &str, password: &str, server: &str, port: u16, name: &str) -> String {
        let userinfo = base64::encode(format!("{}:{}", method, password), Base64Variant::StandardRaw);
        format!("ss://{}@{}:{}#{}", userinfo, server, port, name)
    }

    #[test]
    fn test_sip002_round_trip() {
        let link = sip002_link("chacha20-ietf-poly1305", "p@ss:word", "1.2.3.4", 8388, "HK%2001");
        let item = explode_ss(&link).unwrap();
        assert_eq!(item.name, "HK 01");
        assert_eq!(item.server, "1.2.3.4");
        assert_eq!(item.port, "8388");
        assert_eq!(item.method, "chacha20-ietf-poly1305");
        assert_eq!(item.password, "p@ss:word");
        assert!(item.is_complete());
    }

    #[test]
    fn test_legacy_form() {
        let payload = base64::encode("aes-256-cfb:secret@example.com:443", Base64Variant::Standard);
        let item = explode_ss(&format!("ss://{}#Legacy", payload)).unwrap();
        assert_eq!(item.method, "aes-256-cfb");
        assert_eq!(item.password, "secret");
        assert_eq!(item.server, "example.com");
        assert_eq!(item.port, "443");
    }

    #[test]
    fn test_plain_userinfo() {
        let item = explode_ss("ss://2022-blake3-aes-128-gcm:abc%3D@10.0.0.1:9000#aead").unwrap();
        assert_eq!(item.method, "2022-blake3-aes-128-gcm");
        assert_eq!(item.password, "abc=");
        assert_eq!(item.port_number(), Some(9000));
    }

    #[test]
    fn test_plugin_suffix() {
        let userinfo = base64::encode("aes-128-gcm:pw", Base64Variant::UrlSafeRaw);
        let link = format!(
            "ss://{}@1.2.3.4:8388/?plugin=obfs-local%3Bobfs%3Dhttp%3Bobfs-host%3Dbing.com#JP",
            userinfo
        );
        let item = explode_ss(&link).unwrap();
        assert_eq!(item.plugins.get("plugin").map(String::as_str), Some("obfs-local"));
        assert_eq!(item.plugins.get("obfs").map(String::as_str), Some("http"));
        assert_eq!(item.plugins.get("obfs-host").map(String::as_str), Some("bing.com"));
        assert_eq!(item.port, "8388");
    }

    #[test]
    fn test_malformed_line_yields_partial_item() {
        let item = explode_ss("ss://%%%not-base64%%%#Broken").unwrap();
        assert_eq!(item.name, "Broken");
        assert!(item.server.is_empty());
        assert!(item.port.is_empty());
        assert!(item.method.is_empty());
        assert!(!item.is_complete());

        assert!(explode_ss("vmess://abc").is_err());
    }

    #[test]
    fn test_subscription_threshold() {
        let good = sip002_link("aes-128-gcm", "pw", "1.2.3.4", 8388, "US%2001");
        let body = base64::encode(
            format!("{}\nss://%%%#Broken\nREMARKS=ignored\n", good),
            Base64Variant::Standard,
        );
        let items = explode_ss_sub(body.as_bytes()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "US 01");
        assert_eq!(items[1].name, "Broken");

        let body = base64::encode("ss://%%%#A\nss://%%%#B\n", Base64Variant::Standard);
        assert_eq!(
            explode_ss_sub(body.as_bytes()).unwrap_err(),
            DecodeError::NoValidNodes { lines: 2 }
        );
    }

    #[test]
    fn test_plain_text_body() {
        let good = sip002_link("aes-128-gcm", "pw", "1.2.3.4", 8388, "SG");
        let items = explode_ss_sub(good.as_bytes()).unwrap();
        assert_eq!(items[0].server, "1.2.3.4");
        assert!(explode_ss_sub(b"<html>nope</html>").is_err());
    }
}
