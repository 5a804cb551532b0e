use thiserror::Error;

use crate::utils::base64::Base64Variant;

/// Failures while turning raw subscription bytes into item records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid {variant} base64: {reason}")]
    Base64 {
        variant: Base64Variant,
        reason: String,
    },

    #[error("payload does not match the {scheme} pattern: {payload}")]
    Pattern {
        scheme: &'static str,
        payload: String,
    },

    #[error("invalid port '{0}'")]
    Port(String),

    #[error("invalid query string: {0}")]
    Query(String),

    #[error("no valid nodes in subscription ({lines} candidate lines)")]
    NoValidNodes { lines: usize },
}

/// A reference inside an assembled configuration that does not resolve.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("group '{group}' references unknown member '{member}'")]
    DanglingMember { group: String, member: String },

    #[error("rule '{rule}' targets unknown policy '{target}'")]
    DanglingRuleTarget { rule: String, target: String },

    #[error("rule '{rule}' uses undeclared rule provider '{provider}'")]
    UnknownRuleProvider { rule: String, provider: String },

    #[error("duplicate proxy group name '{0}'")]
    DuplicateGroup(String),

    #[error("duplicate proxy name '{0}'")]
    DuplicateProxy(String),

    #[error("name '{0}' is shared by a proxy, a group or a built-in policy")]
    NameCollision(String),

    #[error("catch-all rule is not the last rule")]
    CatchAllNotLast,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("upstream server returned status {status}")]
    UpstreamFetch { status: u16, body: Vec<u8> },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to fetch rule fragment '{category}': {reason}")]
    ExternalRuleFetch { category: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
