use std::fs::File;
use std::io::BufWriter;

use anyhow::{bail, Context};
use clap::Parser;
use env_logger::Env;
use log::{error, info};

use subrewrite::generator::write_yaml;
use subrewrite::parser::explodes::ssr::fetch_remaining_data_ssr;
use subrewrite::rewrite::{convert, HttpFragmentSource};
use subrewrite::usage::fetch_data_usage;
use subrewrite::utils::http::{web_get, ProxyConfig};
use subrewrite::utils::url::link_host;
use subrewrite::{
    response_headers, Disposition, EmptyGroupPolicy, Error, Processor, RewriteOptions,
    SubscriptionType,
};

/// Rewrite a proxy subscription into a policy-annotated clash configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Subscription URL
    #[arg(long, value_name = "URL", env = "SUBREWRITE_URL")]
    url: String,

    /// Subscription format: clash, ss or ssr (empty means clash)
    #[arg(short = 't', long = "type", value_name = "TYPE", default_value = "", env = "SUBREWRITE_TYPE")]
    sub_type: String,

    /// Output file path, stdout when omitted
    #[arg(short, long, value_name = "OUTPUT_FILE")]
    output: Option<String>,

    /// Empty optional country groups: placeholder or drop
    #[arg(long, value_name = "POLICY", env = "SUBREWRITE_EMPTY_GROUP")]
    empty_group: Option<String>,

    /// Add stream media groups and fetch their rules
    #[arg(long, env = "SUBREWRITE_STREAM_MEDIA")]
    stream_media: bool,

    /// Override the external controller address
    #[arg(long, value_name = "ADDRESS", env = "SUBREWRITE_CONTROLLER")]
    controller: Option<String>,

    /// Keep the upstream groups and rules
    #[arg(long)]
    pass: bool,

    /// Extra static DNS record, repeatable
    #[arg(long = "host", value_name = "PATTERN=IP")]
    hosts: Vec<String>,

    /// Extra IP-CIDR rule placed before the catch-all, repeatable
    #[arg(long = "ip-cidr", value_name = "CIDR:TARGET")]
    ip_cidrs: Vec<String>,

    /// Report the download as an attachment instead of inline
    #[arg(long)]
    attachment: bool,

    /// Print the provider's data usage and exit
    #[arg(long)]
    usage: bool,

    /// Proxy used for fetching the subscription and rule fragments
    #[arg(long, value_name = "PROXY", env = "SUBREWRITE_FETCH_PROXY")]
    fetch_proxy: Option<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let args = Args::parse();
    let proxy_config = ProxyConfig::with_proxy(args.fetch_proxy.clone());
    let sub_type: SubscriptionType = args.sub_type.parse()?;

    if args.usage {
        match sub_type {
            SubscriptionType::Ssr => print!("{}", fetch_remaining_data_ssr(&args.url, &proxy_config)?),
            _ => println!("{}", fetch_data_usage(&args.url, &proxy_config)?),
        }
        return Ok(());
    }

    let options = RewriteOptions {
        empty_group: EmptyGroupPolicy::parse(args.empty_group.as_deref())?,
        stream_media: args.stream_media,
        external_controller: args.controller.clone(),
        pass_through: args.pass,
    };

    let mut processors = Vec::new();
    for host in &args.hosts {
        processors.push(Processor::parse_host(host)?);
    }
    for rule in &args.ip_cidrs {
        processors.push(Processor::parse_ip_cidr(rule)?);
    }

    info!("Processing {} subscription from URL: {}", sub_type, args.url);
    let response = web_get(&args.url, &proxy_config).context("failed to fetch subscription")?;

    let fragments = HttpFragmentSource::new(proxy_config.clone());
    let config = match convert(&response, sub_type, &options, &processors, &fragments) {
        Ok(config) => config,
        Err(Error::UpstreamFetch { status, body }) => {
            error!("{}", String::from_utf8_lossy(&body));
            bail!("upstream server returned status {}", status);
        }
        Err(e) => return Err(e.into()),
    };

    let host = link_host(&args.url).unwrap_or_default();
    let disposition = if args.attachment {
        Disposition::Attachment
    } else {
        Disposition::Inline
    };
    for (name, value) in response_headers(&response, &host, disposition) {
        info!("{}: {}", name, value);
    }

    match &args.output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("failed to create {}", path))?;
            write_yaml(&config, BufWriter::new(file))?;
            info!("Successfully wrote configuration to {}", path);
        }
        None => write_yaml(&config, std::io::stdout().lock())?,
    }

    Ok(())
}
