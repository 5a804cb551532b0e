//! URI-scheme subscription parsers
//!
//! Each parser turns one link into a flat item record; mapping those to
//! [`crate::models::Node`] happens in [`crate::parser::mapping`].

pub mod ss;
pub mod ssr;

pub use ss::{explode_ss, explode_ss_sub, SsItem};
pub use ssr::{explode_ssr, explode_ssr_sub, SsrItem};
