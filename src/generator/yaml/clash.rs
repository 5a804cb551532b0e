use std::collections::HashSet;
use std::io::Write;

use log::debug;

use crate::error::{Result, ValidationError};
use crate::models::{is_literal_policy, Configuration, RuleKind};

/// Check that every reference in `config` resolves.
///
/// Group members and rule targets must name a proxy, a group or a literal
/// policy, `RULE-SET` rules must name a declared provider, and the
/// catch-all must come last. Proxies, groups and built-in policies share one
/// namespace, so a name may appear in only one of them. Rules of kinds not modelled
/// here (logical rules and the like) are not inspected.
pub fn validate(config: &Configuration) -> Result<(), ValidationError> {
    let mut proxies = HashSet::new();
    for node in &config.proxies {
        if is_literal_policy(&node.name) {
            return Err(ValidationError::NameCollision(node.name.clone()));
        }
        if !proxies.insert(node.name.as_str()) {
            return Err(ValidationError::DuplicateProxy(node.name.clone()));
        }
    }

    let mut groups = HashSet::new();
    for group in &config.proxy_groups {
        if is_literal_policy(&group.name) || proxies.contains(group.name.as_str()) {
            return Err(ValidationError::NameCollision(group.name.clone()));
        }
        if !groups.insert(group.name.as_str()) {
            return Err(ValidationError::DuplicateGroup(group.name.clone()));
        }
    }

    let resolves =
        |name: &str| is_literal_policy(name) || proxies.contains(name) || groups.contains(name);

    for group in &config.proxy_groups {
        if let Some(member) = group.proxies.iter().find(|m| !resolves(m)) {
            return Err(ValidationError::DanglingMember {
                group: group.name.clone(),
                member: member.clone(),
            });
        }
    }

    let last = config.rules.len().saturating_sub(1);
    for (index, rule) in config.rules.iter().enumerate() {
        if matches!(rule.kind, RuleKind::Custom(_)) {
            continue;
        }
        if rule.is_catch_all() && index != last {
            return Err(ValidationError::CatchAllNotLast);
        }
        if rule.kind == RuleKind::RuleSet {
            let provider = rule.payload.as_deref().unwrap_or_default();
            if !config.rule_providers.contains_key(provider) {
                return Err(ValidationError::UnknownRuleProvider {
                    rule: rule.to_string(),
                    provider: provider.to_string(),
                });
            }
        }
        if !resolves(&rule.target) {
            return Err(ValidationError::DanglingRuleTarget {
                rule: rule.to_string(),
                target: rule.target.clone(),
            });
        }
    }

    debug!(
        "validated {} proxies, {} groups, {} rules",
        proxies.len(),
        groups.len(),
        config.rules.len()
    );
    Ok(())
}

/// Serialize `config` as YAML into `out`.
pub fn write_yaml<W: Write>(config: &Configuration, mut out: W) -> Result<()> {
    serde_yaml::to_writer(&mut out, config)?;
    out.flush()?;
    Ok(())
}

pub fn to_yaml_string(config: &Configuration) -> Result<String> {
    Ok(serde_yaml::to_string(config)?)
}
