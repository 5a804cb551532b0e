//! Routing rules
//!
//! A rule is kept structured in memory and only turned into the clash
//! `KIND,PATTERN,TARGET[,OPTION...]` line when serialized.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DecodeError;

/// Matcher kind of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Domain,
    DomainSuffix,
    DomainKeyword,
    Geosite,
    Geoip,
    IpCidr,
    IpCidr6,
    SrcIpCidr,
    SrcPort,
    DstPort,
    ProcessName,
    ProcessPath,
    RuleSet,
    /// The catch-all, always the last rule.
    Match,
    /// A kind read from a remote document that is not modelled here.
    Custom(String),
}

impl RuleKind {
    pub fn as_str(&self) -> &str {
        match self {
            RuleKind::Domain => "DOMAIN",
            RuleKind::DomainSuffix => "DOMAIN-SUFFIX",
            RuleKind::DomainKeyword => "DOMAIN-KEYWORD",
            RuleKind::Geosite => "GEOSITE",
            RuleKind::Geoip => "GEOIP",
            RuleKind::IpCidr => "IP-CIDR",
            RuleKind::IpCidr6 => "IP-CIDR6",
            RuleKind::SrcIpCidr => "SRC-IP-CIDR",
            RuleKind::SrcPort => "SRC-PORT",
            RuleKind::DstPort => "DST-PORT",
            RuleKind::ProcessName => "PROCESS-NAME",
            RuleKind::ProcessPath => "PROCESS-PATH",
            RuleKind::RuleSet => "RULE-SET",
            RuleKind::Match => "MATCH",
            RuleKind::Custom(kind) => kind,
        }
    }

    /// Parses a matcher token; unknown tokens become [`RuleKind::Custom`].
    pub fn parse(token: &str) -> Self {
        match token.trim().to_ascii_uppercase().as_str() {
            "DOMAIN" => RuleKind::Domain,
            "DOMAIN-SUFFIX" => RuleKind::DomainSuffix,
            "DOMAIN-KEYWORD" => RuleKind::DomainKeyword,
            "GEOSITE" => RuleKind::Geosite,
            "GEOIP" => RuleKind::Geoip,
            "IP-CIDR" => RuleKind::IpCidr,
            "IP-CIDR6" => RuleKind::IpCidr6,
            "SRC-IP-CIDR" => RuleKind::SrcIpCidr,
            "SRC-PORT" => RuleKind::SrcPort,
            "DST-PORT" => RuleKind::DstPort,
            "PROCESS-NAME" => RuleKind::ProcessName,
            "PROCESS-PATH" => RuleKind::ProcessPath,
            "RULE-SET" => RuleKind::RuleSet,
            "MATCH" => RuleKind::Match,
            _ => RuleKind::Custom(token.trim().to_string()),
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered matcher → target pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub kind: RuleKind,
    /// `None` only for the catch-all.
    pub payload: Option<String>,
    pub target: String,
    /// Trailing flags such as `no-resolve`.
    pub options: Vec<String>,
}

impl Rule {
    pub fn new(kind: RuleKind, payload: impl Into<String>, target: impl Into<String>) -> Self {
        Rule {
            kind,
            payload: Some(payload.into()),
            target: target.into(),
            options: Vec::new(),
        }
    }

    pub fn domain(domain: &str, target: &str) -> Self {
        Self::new(RuleKind::Domain, domain, target)
    }

    pub fn domain_suffix(suffix: &str, target: &str) -> Self {
        Self::new(RuleKind::DomainSuffix, suffix, target)
    }

    pub fn domain_keyword(keyword: &str, target: &str) -> Self {
        Self::new(RuleKind::DomainKeyword, keyword, target)
    }

    pub fn geoip(code: &str, target: &str) -> Self {
        Self::new(RuleKind::Geoip, code, target)
    }

    pub fn ip_cidr(cidr: &str, target: &str) -> Self {
        Self::new(RuleKind::IpCidr, cidr, target)
    }

    pub fn rule_set(provider: &str, target: &str) -> Self {
        Self::new(RuleKind::RuleSet, provider, target)
    }

    /// `MATCH,<target>`
    pub fn catch_all(target: impl Into<String>) -> Self {
        Rule {
            kind: RuleKind::Match,
            payload: None,
            target: target.into(),
            options: Vec::new(),
        }
    }

    pub fn with_option(mut self, option: impl Into<String>) -> Self {
        self.options.push(option.into());
        self
    }

    pub fn is_catch_all(&self) -> bool {
        self.kind == RuleKind::Match
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(payload) = &self.payload {
            write!(f, ",{}", payload)?;
        }
        write!(f, ",{}", self.target)?;
        for option in &self.options {
            write!(f, ",{}", option)?;
        }
        Ok(())
    }
}

impl FromStr for Rule {
    type Err = DecodeError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let invalid = || DecodeError::Pattern {
            scheme: "rule",
            payload: line.to_string(),
        };

        if fields.len() < 2 || fields.iter().take(2).any(|f| f.is_empty()) {
            return Err(invalid());
        }

        let kind = RuleKind::parse(fields[0]);
        // MATCH (and unknown two-field kinds) carry no pattern
        if kind == RuleKind::Match || fields.len() == 2 {
            return Ok(Rule {
                kind,
                payload: None,
                target: fields[1].to_string(),
                options: fields[2..].iter().map(|s| s.to_string()).collect(),
            });
        }

        if fields[2].is_empty() {
            return Err(invalid());
        }
        Ok(Rule {
            kind,
            payload: Some(fields[1].to_string()),
            target: fields[2].to_string(),
            options: fields[3..].iter().map(|s| s.to_string()).collect(),
        })
    }
}

impl Serialize for Rule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let line = String::deserialize(deserializer)?;
        line.parse().map_err(serde::de::Error::custom)
    }
}
