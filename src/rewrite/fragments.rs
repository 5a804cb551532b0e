//! Third-party rule fragments
//!
//! Stream media rules come from the ACL4SSR rule set lists: one plain-text
//! file per category, `KIND,PATTERN[,no-resolve]` per line, with no target.
//! The target group is appended here.

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{Rule, RuleKind};
use crate::utils::http::{web_get_ok, ProxyConfig};

pub const ACL4SSR_BASE_URL: &str =
    "https://raw.githubusercontent.com/ACL4SSR/ACL4SSR/master/Clash/Ruleset/";

/// Where fragment text comes from.
pub trait FragmentSource {
    /// Raw fragment text for a category such as `Netflix`.
    fn fetch(&self, category: &str) -> Result<String>;
}

/// Fetches `<base>/<category>.list` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFragmentSource {
    base_url: String,
    proxy_config: ProxyConfig,
}

impl HttpFragmentSource {
    pub fn new(proxy_config: ProxyConfig) -> Self {
        HttpFragmentSource {
            base_url: ACL4SSR_BASE_URL.to_string(),
            proxy_config,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn url_for(&self, category: &str) -> String {
        format!("{}/{}.list", self.base_url.trim_end_matches('/'), category)
    }
}

impl Default for HttpFragmentSource {
    fn default() -> Self {
        Self::new(ProxyConfig::default())
    }
}

impl FragmentSource for HttpFragmentSource {
    fn fetch(&self, category: &str) -> Result<String> {
        let url = self.url_for(category);
        debug!("fetching rule fragment {}", url);
        let response =
            web_get_ok(&url, &self.proxy_config).map_err(|e| Error::ExternalRuleFetch {
                category: category.to_string(),
                reason: e.to_string(),
            })?;
        Ok(String::from_utf8_lossy(&response.body).into_owned())
    }
}

/// A source with nothing in it, for runs without network access.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFragments;

impl FragmentSource for NoFragments {
    fn fetch(&self, category: &str) -> Result<String> {
        Err(Error::ExternalRuleFetch {
            category: category.to_string(),
            reason: "fragment fetching is disabled".to_string(),
        })
    }
}

/// Turn fragment text into rules targeting `group`.
///
/// Comments, blank lines and `USER-AGENT` lines (unsupported by clash) are
/// skipped; `no-resolve` stays after the target.
pub fn parse_fragment(text: &str, group: &str) -> Vec<Rule> {
    let mut rules = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') || line.contains("USER-AGENT") {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < 2 || fields[1].is_empty() {
            debug!("ignoring fragment line: {}", line);
            continue;
        }

        let mut rule = Rule::new(RuleKind::parse(fields[0]), fields[1], group);
        rule.options = fields[2..]
            .iter()
            .filter(|f| !f.is_empty())
            .map(|f| f.to_string())
            .collect();
        rules.push(rule);
    }
    rules
}

/// Fetch and parse one category. A failed fetch is logged and yields no
/// rules.
pub fn fragment_rules(source: &dyn FragmentSource, category: &str, group: &str) -> Vec<Rule> {
    match source.fetch(category) {
        Ok(text) => {
            let rules = parse_fragment(&text, group);
            debug!("{} rules from fragment {}", rules.len(), category);
            rules
        }
        Err(e) => {
            warn!("{}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NETFLIX: &str = "\
# NAME: Netflix
# TOTAL: 5
DOMAIN-SUFFIX,netflix.com
DOMAIN-KEYWORD,nflxvideo

USER-AGENT,Argo*
IP-CIDR,23.246.0.0/18,no-resolve
PROCESS-NAME,netflix
";

    #[test]
    fn test_parse_fragment() {
        let rules: Vec<String> = parse_fragment(NETFLIX, "📺Netflix")
            .iter()
            .map(|r| r.to_string())
            .collect();
        assert_eq!(
            rules,
            vec![
                "DOMAIN-SUFFIX,netflix.com,📺Netflix",
                "DOMAIN-KEYWORD,nflxvideo,📺Netflix",
                "IP-CIDR,23.246.0.0/18,📺Netflix,no-resolve",
                "PROCESS-NAME,netflix,📺Netflix",
            ]
        );
        assert_eq!(parse_fragment(NETFLIX, "g")[2].options, vec!["no-resolve"]);
    }

    #[test]
    fn test_failed_fetch_yields_nothing() {
        assert!(fragment_rules(&NoFragments, "Hulu", "📺Hulu").is_empty());
    }

    #[test]
    fn test_url_for() {
        let source = HttpFragmentSource::default().with_base_url("http://127.0.0.1:8080/lists/");
        assert_eq!(source.url_for("Hulu"), "http://127.0.0.1:8080/lists/Hulu.list");
        assert_eq!(
            HttpFragmentSource::default().url_for("Netflix"),
            "https://raw.githubusercontent.com/ACL4SSR/ACL4SSR/master/Clash/Ruleset/Netflix.list"
        );
    }
}
