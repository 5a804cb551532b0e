pub mod error;
pub mod generator;
pub mod models;
pub mod parser;
pub mod rewrite;
pub mod template;
pub mod usage;
pub mod utils;

pub use error::{DecodeError, Error, Result, ValidationError};
pub use models::{Configuration, Node, NodeType, ProxyGroup, Rule};
pub use parser::{decode_subscription, response_headers, Disposition, RemoteResponse, SubscriptionType};
pub use rewrite::{
    convert, pass_through, rewrite, rewrite_to, EmptyGroupPolicy, Processor, RewriteOptions,
};
pub use template::PolicyTemplate;
pub use usage::DataUsage;
