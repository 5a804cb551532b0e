//! Rewrite engine
//!
//! Merges decoded remote nodes with a [`PolicyTemplate`]: nodes are bucketed
//! per country, the template's groups, rules and providers are laid around
//! them, processors run last and the result is validated.
//!
//! ```rust
//! use subrewrite::models::{Configuration, Node, NodeType};
//! use subrewrite::rewrite::{rewrite, NoFragments, RewriteOptions};
//!
//! let remote = Configuration {
//!     proxies: vec![Node::new("🇭🇰 HK 01", NodeType::Shadowsocks).endpoint("hk.example.com", 8388)],
//!     ..Default::default()
//! };
//! let config = rewrite(remote, &RewriteOptions::default(), &[], &NoFragments).unwrap();
//! assert_eq!(config.group("🇭🇰HK").unwrap().proxies, vec!["🇭🇰 HK 01"]);
//! assert!(config.rules.last().unwrap().is_catch_all());
//! ```

pub mod fragments;
pub mod processor;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

use log::{info, warn};

use crate::error::{Error, Result};
use crate::generator::{validate, write_yaml};
use crate::models::group::LITERAL_POLICIES;
use crate::models::{classify, Configuration, Country, Node, ProxyGroup, Rule, DIRECT};
use crate::parser::subscription::{decode_subscription, RemoteResponse, SubscriptionType};
use crate::template::PolicyTemplate;

use fragments::fragment_rules;
pub use fragments::{FragmentSource, HttpFragmentSource, NoFragments};
pub use processor::{apply_all, Processor};

/// What to do with an optional country bucket no node matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyGroupPolicy {
    /// Keep the group with `DIRECT` as its only member
    #[default]
    Placeholder,
    /// Leave the group out and unlink it everywhere
    Drop,
}

impl EmptyGroupPolicy {
    /// Absent and empty values map to [`EmptyGroupPolicy::Placeholder`].
    pub fn parse(value: Option<&str>) -> Result<Self> {
        match value.map(str::trim) {
            None | Some("") => Ok(EmptyGroupPolicy::default()),
            Some(v) if v.eq_ignore_ascii_case("placeholder") => Ok(EmptyGroupPolicy::Placeholder),
            Some(v) if v.eq_ignore_ascii_case("drop") => Ok(EmptyGroupPolicy::Drop),
            Some(v) => Err(Error::Config(format!("unknown empty group policy '{}'", v))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EmptyGroupPolicy::Placeholder => "placeholder",
            EmptyGroupPolicy::Drop => "drop",
        }
    }
}

impl FromStr for EmptyGroupPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(Some(s))
    }
}

impl fmt::Display for EmptyGroupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request knobs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteOptions {
    pub empty_group: EmptyGroupPolicy,
    /// Add stream media groups and fetch their rule fragments
    pub stream_media: bool,
    /// Overrides `external-controller`, applied after the caller's processors
    pub external_controller: Option<String>,
    /// Keep the upstream groups and rules instead of the template's
    pub pass_through: bool,
}

impl RewriteOptions {
    /// Caller processors followed by the ones implied by the options.
    fn processors(&self, processors: &[Processor]) -> Vec<Processor> {
        let mut all = processors.to_vec();
        if let Some(address) = &self.external_controller {
            all.push(Processor::SetExternalController(address.clone()));
        }
        all
    }
}

/// Rewrite `remote` against the stock template.
pub fn rewrite(
    remote: Configuration,
    options: &RewriteOptions,
    processors: &[Processor],
    fragments: &dyn FragmentSource,
) -> Result<Configuration> {
    rewrite_with(
        &PolicyTemplate::standard(),
        remote,
        options,
        processors,
        fragments,
    )
}

/// Rewrite `remote` against `template`.
///
/// Remote nodes are renamed where they collide with each other or with a
/// name the template uses, then bucketed per country. The template's
/// groups, rule blocks and providers are laid around them, processors run,
/// the catch-all is moved back to the end and the result is validated.
///
/// # Arguments
/// * `template` - Groups, rules and providers to build around the nodes
/// * `remote` - The decoded subscription; only its `proxies` are used
/// * `options` - Empty-group policy, stream media and controller override
/// * `processors` - Caller mutations applied after assembly
/// * `fragments` - Source of stream media rule fragments
///
/// # Returns
/// * The assembled configuration
/// * `Error::Validation` if a processor left a dangling reference
pub fn rewrite_with(
    template: &PolicyTemplate,
    remote: Configuration,
    options: &RewriteOptions,
    processors: &[Processor],
    fragments: &dyn FragmentSource,
) -> Result<Configuration> {
    let remote_nodes = unique_names(remote.proxies, &reserved_names(template));

    /* proxy groups */
    let mut grand = ProxyGroup::select(template.grand.as_str(), Vec::<String>::new());
    let (country_groups, dropped) =
        group_by_countries(template, &remote_nodes, options.empty_group, &mut grand);
    grand.proxies.push(template.all_nodes.clone());
    grand.proxies.push(template.self_hosted.clone());

    let mut all_nodes =
        ProxyGroup::select(template.all_nodes.as_str(), remote_nodes.iter().map(|n| n.name.as_str()));
    if all_nodes.proxies.is_empty() {
        all_nodes.proxies.push(DIRECT.to_string());
    }

    let mut proxy_groups = vec![grand, all_nodes];
    proxy_groups.extend(
        template
            .static_groups
            .iter()
            .map(|g| prune_members(g.clone(), &dropped)),
    );

    /* rules */
    let mut rules: Vec<Rule> = template
        .rule_blocks
        .iter()
        .flat_map(|block| block.rules.iter().cloned())
        .collect();

    if options.stream_media {
        for media in &template.stream_media {
            let group = prune_members(template.stream_group(media), &dropped);
            rules.extend(fragment_rules(fragments, media.key, &group.name));
            proxy_groups.push(group);
        }
    }

    proxy_groups.extend(country_groups);

    /* rule providers */
    let mut config = Configuration::local_defaults();
    for entry in &template.providers {
        config
            .rule_providers
            .insert(entry.name.clone(), entry.provider.clone());
        if let Some(chain) = &entry.chain {
            rules.push(Rule::rule_set(&entry.name, chain));
        }
    }
    rules.push(Rule::geoip("CN", DIRECT));
    rules.push(Rule::catch_all(template.leftover.as_str()));

    config.proxies = remote_nodes;
    config.proxies.extend(template.user_nodes.iter().cloned());
    config.proxy_groups = proxy_groups;
    config.rules = rules;

    apply_all(&options.processors(processors), &mut config);
    restore_catch_all(&mut config);

    validate(&config)?;
    info!(
        "rewrote configuration: {} proxies, {} groups, {} rules",
        config.proxies.len(),
        config.proxy_groups.len(),
        config.rules.len()
    );
    Ok(config)
}

/// Rewrite and serialize into `out`.
pub fn rewrite_to<W: Write>(
    remote: Configuration,
    options: &RewriteOptions,
    processors: &[Processor],
    fragments: &dyn FragmentSource,
    out: W,
) -> Result<()> {
    let config = rewrite(remote, options, processors, fragments)?;
    write_yaml(&config, out)
}

/// Keep the upstream document's nodes, groups and rules, with the local
/// connection settings.
pub fn pass_through(remote: Configuration, processors: &[Processor]) -> Configuration {
    let mut config = Configuration::local_defaults();
    config.proxies = remote.proxies;
    config.proxy_providers = remote.proxy_providers;
    config.proxy_groups = remote.proxy_groups;
    config.rule_providers = remote.rule_providers;
    config.rules = remote.rules;
    apply_all(processors, &mut config);
    config
}

/// Decode an upstream response and convert it as `options` say.
pub fn convert(
    response: &RemoteResponse,
    sub_type: SubscriptionType,
    options: &RewriteOptions,
    processors: &[Processor],
    fragments: &dyn FragmentSource,
) -> Result<Configuration> {
    let remote = decode_subscription(response, sub_type)?;
    if options.pass_through {
        return Ok(pass_through(remote, &options.processors(processors)));
    }
    rewrite(remote, options, processors, fragments)
}

/// Every name the template itself declares or refers to, which remote nodes
/// must not take.
fn reserved_names(template: &PolicyTemplate) -> HashSet<String> {
    let mut reserved: HashSet<String> = template
        .static_groups
        .iter()
        .map(|g| g.name.clone())
        .chain(template.user_nodes.iter().map(|n| n.name.clone()))
        .chain(template.countries.iter().map(|c| c.country.group_tag()))
        .chain(
            template
                .stream_media
                .iter()
                .map(|m| template.stream_group_name(m.key)),
        )
        .chain(LITERAL_POLICIES.iter().map(|p| p.to_string()))
        .collect();
    reserved.insert(template.grand.clone());
    reserved.insert(template.all_nodes.clone());
    reserved
}

/// One `select` group per templated country, appended to `grand`.
///
/// Returns the groups in template order and the tags of the dropped ones.
fn group_by_countries(
    template: &PolicyTemplate,
    nodes: &[Node],
    policy: EmptyGroupPolicy,
    grand: &mut ProxyGroup,
) -> (Vec<ProxyGroup>, HashSet<String>) {
    let mut buckets: HashMap<Country, Vec<String>> = HashMap::new();
    for node in nodes {
        buckets
            .entry(classify(&node.name))
            .or_default()
            .push(node.name.clone());
    }

    let mut groups = Vec::new();
    let mut dropped = HashSet::new();
    for entry in &template.countries {
        let tag = entry.country.group_tag();
        let mut group = ProxyGroup::select(
            tag.as_str(),
            buckets.remove(&entry.country).unwrap_or_default(),
        );

        if group.proxies.is_empty() {
            if entry.is_required() || policy == EmptyGroupPolicy::Placeholder {
                info!("no nodes matched for country {}, put a DIRECT here", entry.country);
                group.proxies.push(DIRECT.to_string());
            } else {
                info!("no nodes matched for country {}, dropped", entry.country);
                dropped.insert(tag);
                continue;
            }
        }

        grand.proxies.push(group.name.clone());
        groups.push(group);
    }
    (groups, dropped)
}

/// Remove dropped groups from `group`; an emptied group falls back to
/// `DIRECT`.
fn prune_members(mut group: ProxyGroup, dropped: &HashSet<String>) -> ProxyGroup {
    if dropped.is_empty() {
        return group;
    }
    group.proxies.retain(|m| !dropped.contains(m));
    if group.proxies.is_empty() {
        group.proxies.push(DIRECT.to_string());
    }
    group
}

/// Give every node a distinct name: the second `X` becomes `X 2`, the
/// third `X 3`. Names in `reserved` count as taken.
fn unique_names(nodes: Vec<Node>, reserved: &HashSet<String>) -> Vec<Node> {
    let mut taken: HashSet<String> = reserved.clone();
    let mut seen: HashMap<String, usize> = HashMap::new();

    nodes
        .into_iter()
        .map(|mut node| {
            let count = seen.entry(node.name.clone()).or_insert(0);
            *count += 1;
            if taken.contains(&node.name) {
                let mut n = (*count).max(2);
                let mut candidate = format!("{} {}", node.name, n);
                while taken.contains(&candidate) {
                    n += 1;
                    candidate = format!("{} {}", node.name, n);
                }
                warn!("duplicate node name '{}', renamed to '{}'", node.name, candidate);
                node.name = candidate;
            }
            taken.insert(node.name.clone());
            node
        })
        .collect()
}

/// Move the catch-all back to the end if a processor displaced it.
fn restore_catch_all(config: &mut Configuration) {
    if let Some(index) = config.rules.iter().position(Rule::is_catch_all) {
        if index != config.rules.len() - 1 {
            let catch_all = config.rules.remove(index);
            config.rules.push(catch_all);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::models::NodeType;

    fn node(name: &str) -> Node {
        Node::new(name, NodeType::Shadowsocks)
            .endpoint("203.0.113.1", 8388)
            .credentials("aes-128-gcm", "pw")
    }

    fn remote(names: &[&str]) -> Configuration {
        Configuration {
            proxies: names.iter().map(|n| node(n)).collect(),
            ..Default::default()
        }
    }

    struct StubFragments;

    impl FragmentSource for StubFragments {
        fn fetch(&self, category: &str) -> Result<String> {
            match category {
                "Netflix" => Ok("DOMAIN-SUFFIX,netflix.com\n".to_string()),
                _ => Err(Error::ExternalRuleFetch {
                    category: category.to_string(),
                    reason: "unreachable".to_string(),
                }),
            }
        }
    }

    #[test]
    fn test_empty_group_policy_parse() {
        assert_eq!(EmptyGroupPolicy::parse(None).unwrap(), EmptyGroupPolicy::Placeholder);
        assert_eq!(EmptyGroupPolicy::parse(Some("")).unwrap(), EmptyGroupPolicy::Placeholder);
        assert_eq!(EmptyGroupPolicy::parse(Some("drop")).unwrap(), EmptyGroupPolicy::Drop);
        assert!(matches!(
            EmptyGroupPolicy::parse(Some("remove")),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_hk_us_example() {
        let config = rewrite(
            remote(&["🇭🇰 HK 01", "🇺🇸 US 01"]),
            &RewriteOptions::default(),
            &[],
            &NoFragments,
        )
        .unwrap();

        assert_eq!(config.group("🇭🇰HK").unwrap().proxies, vec!["🇭🇰 HK 01"]);
        assert_eq!(config.group("🇺🇸US").unwrap().proxies, vec!["🇺🇸 US 01"]);
        for tag in ["🇹🇼TW", "🇯🇵JP", "🇸🇬SG", "🇬🇧GB", "🇫🇷FR", "🇩🇪DE", "🇹🇭TH", "🇰🇷KR", "🇮🇸IS"] {
            assert_eq!(config.group(tag).unwrap().proxies, vec![DIRECT], "{}", tag);
        }

        let grand = config.group("🚀节点选择").unwrap();
        assert_eq!(grand.proxies.len(), 11 + 2);
        assert_eq!(grand.proxies[0], "🇭🇰HK");
        assert_eq!(grand.proxies[11], "🌏全部节点");
        assert_eq!(grand.proxies[12], "Self host servers");

        assert_eq!(
            config.group("🌏全部节点").unwrap().proxies,
            vec!["🇭🇰 HK 01", "🇺🇸 US 01"]
        );
        assert_eq!(config.proxy_groups[0].name, "🚀节点选择");
        assert_eq!(config.proxy_groups[1].name, "🌏全部节点");
        assert_eq!(config.proxy_groups.last().unwrap().name, "🇮🇸IS");

        // remote nodes first, then the template's own
        assert_eq!(config.proxies[0].name, "🇭🇰 HK 01");
        assert_eq!(config.proxies.len(), 2 + 3);

        let n = config.rules.len();
        assert_eq!(config.rules[n - 1].to_string(), "MATCH,🐟漏网之鱼");
        assert_eq!(config.rules[n - 2].to_string(), "GEOIP,CN,DIRECT");
        assert!(config.group("📺Netflix").is_none());
        assert_eq!(config.mixed_port, Some(7890));
    }

    #[test]
    fn test_required_country_never_dropped() {
        let options = RewriteOptions {
            empty_group: EmptyGroupPolicy::Drop,
            ..Default::default()
        };
        let config = rewrite(remote(&["🇭🇰 HK 01"]), &options, &[], &NoFragments).unwrap();
        assert_eq!(config.group("🇹🇼TW").unwrap().proxies, vec![DIRECT]);
        assert_eq!(config.group("🇩🇪DE").unwrap().proxies, vec![DIRECT]);
    }

    #[test]
    fn test_drop_optional_country() {
        let options = RewriteOptions {
            empty_group: EmptyGroupPolicy::Drop,
            ..Default::default()
        };
        let config = rewrite(remote(&["🇭🇰 HK 01", "韩国 01"]), &options, &[], &NoFragments).unwrap();

        assert!(config.group("🇹🇭TH").is_none());
        assert!(config.group("🇮🇸IS").is_none());
        assert_eq!(config.group("🇰🇷KR").unwrap().proxies, vec!["韩国 01"]);

        let grand = config.group("🚀节点选择").unwrap();
        assert!(!grand.contains("🇹🇭TH"));
        assert!(grand.contains("🇰🇷KR"));
        // unlinked from the static group too
        assert_eq!(config.group("小众节点").unwrap().proxies, vec!["🇰🇷KR"]);

        let config = rewrite(remote(&["🇭🇰 HK 01"]), &options, &[], &NoFragments).unwrap();
        assert_eq!(config.group("小众节点").unwrap().proxies, vec![DIRECT]);
    }

    #[test]
    fn test_catch_all_stays_last() {
        let processors = vec![
            Processor::custom(|c| c.rules.push(Rule::domain("late.example.com", DIRECT))),
            Processor::AddRuleIpCidr {
                cidr: "10.0.0.0/8".to_string(),
                target: DIRECT.to_string(),
            },
        ];
        let config = rewrite(
            remote(&["🇭🇰 HK 01"]),
            &RewriteOptions::default(),
            &processors,
            &NoFragments,
        )
        .unwrap();

        let n = config.rules.len();
        assert!(config.rules[n - 1].is_catch_all());
        // the custom rule displaced the catch-all, so the cidr was appended
        assert_eq!(config.rules[n - 2].to_string(), "IP-CIDR,10.0.0.0/8,DIRECT");
        assert_eq!(config.rules[n - 3].to_string(), "DOMAIN,late.example.com,DIRECT");
        assert_eq!(config.rules.iter().filter(|r| r.is_catch_all()).count(), 1);
    }

    #[test]
    fn test_stream_media() {
        let options = RewriteOptions {
            stream_media: true,
            ..Default::default()
        };
        let config = rewrite(remote(&["🇭🇰 HK 01"]), &options, &[], &StubFragments).unwrap();

        for key in ["Hulu", "Netflix", "Pornhub", "Bilibili"] {
            assert!(config.group(&format!("📺{}", key)).is_some(), "{}", key);
        }
        assert!(config
            .rules
            .iter()
            .any(|r| r.to_string() == "DOMAIN-SUFFIX,netflix.com,📺Netflix"));
        // failed categories add groups but no rules
        assert!(!config.rules.iter().any(|r| r.target == "📺Hulu"));
    }

    #[test]
    fn test_rule_providers_wired() {
        let config = rewrite(remote(&[]), &RewriteOptions::default(), &[], &NoFragments).unwrap();
        assert_eq!(config.rule_providers.len(), 18);
        assert!(config.rule_providers.contains_key("gfw"));
        let rule_sets: Vec<_> = config
            .rules
            .iter()
            .filter_map(|r| r.payload.as_deref().filter(|_| r.kind == crate::models::RuleKind::RuleSet))
            .collect();
        assert_eq!(rule_sets.len(), 13);
        assert!(!rule_sets.contains(&"gfw"));
        assert_eq!(rule_sets[0], "microsoft");
        assert_eq!(config.group("🌏全部节点").unwrap().proxies, vec![DIRECT]);
    }

    #[test]
    fn test_duplicate_names_renamed() {
        let config = rewrite(
            remote(&["HK 01", "HK 01", "HK 01", "Self host servers"]),
            &RewriteOptions::default(),
            &[],
            &NoFragments,
        )
        .unwrap();
        let names: Vec<_> = config.proxies.iter().take(4).map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["HK 01", "HK 01 2", "HK 01 3", "Self host servers 2"]);
    }

    #[test]
    fn test_names_taken_by_template_renamed() {
        let config = rewrite(
            remote(&["🇭🇰HK", "📺Netflix", "DIRECT"]),
            &RewriteOptions {
                stream_media: true,
                ..Default::default()
            },
            &[],
            &NoFragments,
        )
        .unwrap();

        let names: Vec<_> = config.proxies.iter().take(3).map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["🇭🇰HK 2", "📺Netflix 2", "DIRECT 2"]);
        assert_eq!(config.group("🇭🇰HK").unwrap().proxies, vec!["🇭🇰HK 2"]);
        assert!(config.proxy("🇭🇰HK").is_none());
        assert!(config.group("📺Netflix").is_some());
    }

    #[test]
    fn test_controller_override() {
        let options = RewriteOptions {
            external_controller: Some("127.0.0.1:9090".to_string()),
            ..Default::default()
        };
        let config = rewrite(remote(&[]), &options, &[], &NoFragments).unwrap();
        assert_eq!(config.external_controller.as_deref(), Some("127.0.0.1:9090"));
    }

    #[test]
    fn test_processor_breaking_references_fails() {
        let processors = vec![Processor::custom(|c| {
            c.proxy_groups.retain(|g| g.name != "🐟漏网之鱼");
        })];
        let err = rewrite(remote(&[]), &RewriteOptions::default(), &processors, &NoFragments)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::DanglingRuleTarget { .. })
        ));
    }

    #[test]
    fn test_pass_through() {
        let mut upstream = remote(&["a", "b"]);
        upstream.proxy_groups = vec![ProxyGroup::select("Proxy", ["a", "b", "Gone"])];
        upstream.rules = vec![Rule::catch_all("Proxy")];
        upstream.port = Some(1080);

        let config = pass_through(upstream, &[Processor::SetExternalController("x:1".to_string())]);
        assert_eq!(config.proxies.len(), 2);
        assert_eq!(config.proxy_groups[0].proxies, vec!["a", "b", "Gone"]);
        assert_eq!(config.port, None);
        assert_eq!(config.mixed_port, Some(7890));
        assert_eq!(config.external_controller.as_deref(), Some("x:1"));
    }

    #[test]
    fn test_convert_dispatch() {
        let body = "proxies:\n  - {name: '🇯🇵 JP 01', type: ss, server: jp.example.com, port: 8388, cipher: aes-128-gcm, password: pw}\nproxy-groups:\n  - {name: Up, type: select, proxies: ['🇯🇵 JP 01']}\n";
        let response = RemoteResponse::ok(body);

        let config = convert(
            &response,
            SubscriptionType::Clash,
            &RewriteOptions::default(),
            &[],
            &NoFragments,
        )
        .unwrap();
        assert_eq!(config.group("🇯🇵JP").unwrap().proxies, vec!["🇯🇵 JP 01"]);
        assert!(config.group("Up").is_none());

        let options = RewriteOptions {
            pass_through: true,
            ..Default::default()
        };
        let config = convert(&response, SubscriptionType::Clash, &options, &[], &NoFragments).unwrap();
        assert!(config.group("Up").is_some());
        assert!(config.group("🇯🇵JP").is_none());
    }
}
