//! Core data models
//!
//! The clash document and its parts: proxy nodes, proxy groups, rules and
//! rule providers, plus the name-based country classifier used to bucket
//! nodes.
//!
//! ```rust
//! use subrewrite::models::{Node, NodeType, ProxyGroup, DIRECT};
//!
//! let node = Node::new("🇭🇰 HK 01", NodeType::Shadowsocks)
//!     .endpoint("hk.example.com", 8388)
//!     .credentials("aes-128-gcm", "secret");
//! let group = ProxyGroup::select("🇭🇰HK", [node.name.as_str(), DIRECT]);
//! assert!(group.contains(DIRECT));
//! ```

pub mod config;
pub mod country;
pub mod group;
pub mod node;
pub mod response;
pub mod rule;
pub mod rule_provider;
mod token;

pub use config::{Configuration, DnsMapping, HostTarget};
pub use country::{classify, Country};
pub use group::{is_literal_policy, GroupType, ProxyGroup, DIRECT, REJECT};
pub use node::{Node, NodeType};
pub use response::RemoteResponse;
pub use rule::{Rule, RuleKind};
pub use rule_provider::{ProviderKind, RuleBehavior, RuleProvider};
