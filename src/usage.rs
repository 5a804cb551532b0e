//! Subscription data usage
//!
//! Providers report traffic in a `Subscription-Userinfo` header:
//! `upload=<bytes>; download=<bytes>; total=<bytes>; expire=<unix seconds>`.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::{DecodeError, Result};
use crate::models::RemoteResponse;
use crate::parser::subscription::HEADER_SUBSCRIPTION_USERINFO;
use crate::utils::http::{web_get_ok, ProxyConfig};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataUsage {
    pub upload: u64,
    pub download: u64,
    pub total: u64,
    /// `None` when the subscription never expires
    pub expire: Option<DateTime<Utc>>,
}

impl DataUsage {
    /// Parse a header value. `upload`, `download` and `total` are required;
    /// a missing or zero `expire` means no expiry.
    pub fn parse(header: &str) -> Result<Self, DecodeError> {
        let invalid = || DecodeError::Pattern {
            scheme: "subscription-userinfo",
            payload: header.to_string(),
        };

        let (mut upload, mut download, mut total, mut expire) = (None, None, None, None);
        for field in header.split(';') {
            let Some((key, value)) = field.split_once('=') else {
                continue;
            };
            let slot = match key.trim().to_ascii_lowercase().as_str() {
                "upload" => &mut upload,
                "download" => &mut download,
                "total" => &mut total,
                "expire" => &mut expire,
                _ => continue,
            };
            *slot = Some(parse_amount(value.trim()).ok_or_else(invalid)?);
        }

        Ok(DataUsage {
            upload: upload.ok_or_else(invalid)?,
            download: download.ok_or_else(invalid)?,
            total: total.ok_or_else(invalid)?,
            expire: expire
                .filter(|secs| *secs > 0)
                .and_then(|secs| i64::try_from(secs).ok())
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        })
    }

    pub fn from_headers(response: &RemoteResponse) -> Result<Self> {
        let header = response
            .header(HEADER_SUBSCRIPTION_USERINFO)
            .ok_or_else(|| DecodeError::Pattern {
                scheme: "subscription-userinfo",
                payload: String::new(),
            })?;
        Ok(Self::parse(header)?)
    }

    pub fn used(&self) -> u64 {
        self.upload.saturating_add(self.download)
    }

    pub fn remaining(&self) -> u64 {
        self.total.saturating_sub(self.used())
    }
}

/// Byte counts are integers, though some providers send floats.
fn parse_amount(value: &str) -> Option<u64> {
    value.parse::<u64>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v as u64)
    })
}

impl fmt::Display for DataUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Used: {:.1}GB / Quota: {:.1}GB / Expires: ",
            self.used() as f64 / GIB,
            self.total as f64 / GIB
        )?;
        match self.expire {
            Some(expire) => write!(f, "{}", expire.format("%Y-%m-%d")),
            None => f.write_str("never"),
        }
    }
}

/// Fetch a subscription and read its usage header.
pub fn fetch_data_usage(link: &str, proxy_config: &ProxyConfig) -> Result<DataUsage> {
    let response = web_get_ok(link, proxy_config)?;
    DataUsage::from_headers(&response)
}
