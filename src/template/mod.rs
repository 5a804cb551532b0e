//! Policy template
//!
//! The fixed part of every rewritten configuration: which countries get a
//! bucket, the service groups, the user nodes, the static rules and the
//! rule providers. A template is a plain value built per conversion; the
//! stock one comes from [`PolicyTemplate::standard`].

mod catalog;

use crate::models::{Country, Node, ProxyGroup, Rule, RuleProvider, DIRECT};

/// Whether an empty country bucket may be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// Always emitted, `[DIRECT]` when no node matched
    Required,
    /// Subject to the empty-group policy
    Optional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountryEntry {
    pub country: Country,
    pub priority: Priority,
}

impl CountryEntry {
    pub const fn required(country: Country) -> Self {
        CountryEntry {
            country,
            priority: Priority::Required,
        }
    }

    pub const fn optional(country: Country) -> Self {
        CountryEntry {
            country,
            priority: Priority::Optional,
        }
    }

    pub fn is_required(&self) -> bool {
        self.priority == Priority::Required
    }
}

/// A named run of static rules.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleBlock {
    pub name: &'static str,
    pub rules: Vec<Rule>,
}

/// A streaming service whose rules come from a third-party fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamMedia {
    /// Fragment category, also the group name after the prefix
    pub key: &'static str,
    pub countries: Vec<Country>,
}

/// A declared rule provider, wired to `chain` when one is given.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderEntry {
    pub name: String,
    pub provider: RuleProvider,
    pub chain: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyTemplate {
    /// Country buckets in output order
    pub countries: Vec<CountryEntry>,
    /// The top-level selector
    pub grand: String,
    /// Selector over every remote node
    pub all_nodes: String,
    /// Target of the catch-all rule
    pub leftover: String,
    /// Group of the user's own servers, listed in the grand selector
    pub self_hosted: String,
    /// Emitted after the grand and all-nodes selectors, in order
    pub static_groups: Vec<ProxyGroup>,
    /// Appended after the remote nodes
    pub user_nodes: Vec<Node>,
    pub rule_blocks: Vec<RuleBlock>,
    pub stream_media: Vec<StreamMedia>,
    /// Prefix of the stream media group names
    pub stream_media_prefix: &'static str,
    pub providers: Vec<ProviderEntry>,
}

impl PolicyTemplate {
    /// Group name of a stream media category.
    pub fn stream_group_name(&self, key: &str) -> String {
        format!("{}{}", self.stream_media_prefix, key)
    }

    /// `select` group for a stream media category: DIRECT, then its
    /// countries.
    pub fn stream_group(&self, media: &StreamMedia) -> ProxyGroup {
        let members = std::iter::once(DIRECT.to_string())
            .chain(media.countries.iter().map(Country::group_tag));
        ProxyGroup::select(self.stream_group_name(media.key), members)
    }

    pub fn country_entry(&self, country: Country) -> Option<&CountryEntry> {
        self.countries.iter().find(|e| e.country == country)
    }
}
