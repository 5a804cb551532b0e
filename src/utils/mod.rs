pub mod base64;
pub mod http;
pub mod url;

pub use url::{url_decode, url_encode};
