use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::error::{Error, Result};
use crate::models::{Configuration, DnsMapping, HostTarget, Rule, RuleKind};

/// A post-processing step run on the assembled configuration.
#[derive(Clone)]
pub enum Processor {
    /// Merge static DNS records, wildcards allowed
    AddHosts(DnsMapping),
    /// Add an `IP-CIDR` rule just before the catch-all
    AddRuleIpCidr { cidr: String, target: String },
    SetExternalController(String),
    Custom(Arc<dyn Fn(&mut Configuration) + Send + Sync>),
}

impl Processor {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&mut Configuration) + Send + Sync + 'static,
    {
        Processor::Custom(Arc::new(f))
    }

    /// Parse `PATTERN=IP[,IP...]` into an [`Processor::AddHosts`].
    pub fn parse_host(spec: &str) -> Result<Self> {
        let (pattern, ips) = spec
            .split_once('=')
            .filter(|(p, ips)| !p.trim().is_empty() && !ips.trim().is_empty())
            .ok_or_else(|| Error::Config(format!("invalid host record '{}'", spec)))?;

        let ips: Vec<String> = ips.split(',').map(|ip| ip.trim().to_string()).collect();
        let target = match ips.as_slice() {
            [one] => HostTarget::One(one.clone()),
            _ => HostTarget::Many(ips),
        };

        let mut records = DnsMapping::new();
        records.insert(pattern.trim().to_string(), target);
        Ok(Processor::AddHosts(records))
    }

    /// Parse `CIDR:TARGET` into an [`Processor::AddRuleIpCidr`]. The split
    /// is at the last `:` so IPv6 ranges work.
    pub fn parse_ip_cidr(spec: &str) -> Result<Self> {
        let (cidr, target) = spec
            .rsplit_once(':')
            .filter(|(c, t)| c.contains('/') && !t.trim().is_empty())
            .ok_or_else(|| Error::Config(format!("invalid ip-cidr rule '{}'", spec)))?;

        Ok(Processor::AddRuleIpCidr {
            cidr: cidr.trim().to_string(),
            target: target.trim().to_string(),
        })
    }

    pub fn apply(&self, config: &mut Configuration) {
        match self {
            Processor::AddHosts(records) => {
                config
                    .hosts
                    .extend(records.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            Processor::AddRuleIpCidr { cidr, target } => {
                let kind = if cidr.contains(':') {
                    RuleKind::IpCidr6
                } else {
                    RuleKind::IpCidr
                };
                let rule = Rule::new(kind, cidr.as_str(), target.as_str());
                match config.catch_all_index() {
                    Some(index) => config.rules.insert(index, rule),
                    None => config.rules.push(rule),
                }
            }
            Processor::SetExternalController(address) => {
                config.external_controller = Some(address.clone());
            }
            Processor::Custom(f) => f(config),
        }
        debug!("applied processor {:?}", self);
    }
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Processor::AddHosts(records) => f.debug_tuple("AddHosts").field(records).finish(),
            Processor::AddRuleIpCidr { cidr, target } => f
                .debug_struct("AddRuleIpCidr")
                .field("cidr", cidr)
                .field("target", target)
                .finish(),
            Processor::SetExternalController(address) => f
                .debug_tuple("SetExternalController")
                .field(address)
                .finish(),
            Processor::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Run processors in order.
pub fn apply_all(processors: &[Processor], config: &mut Configuration) {
    for processor in processors {
        processor.apply(config);
    }
}
