//! The stock policy: groups, rules and providers of the standard template.

use crate::models::{Country, Node, NodeType, ProxyGroup, Rule, RuleBehavior, RuleProvider, DIRECT, REJECT};

use super::{CountryEntry, PolicyTemplate, ProviderEntry, RuleBlock, StreamMedia};

const GRAND: &str = "🚀节点选择";
const ALL_NODES: &str = "🌏全部节点";
const REJECT_GROUP: &str = "⛔垃圾拦截";
const LEFTOVER: &str = "🐟漏网之鱼";
const MINECRAFT: &str = "🪨Minecraft";
const APPLE: &str = "🍎Apple";
const EMBY_UNLOCK: &str = "🧩Emby Unlock";
const EMBY_TAG: &str = "🧩Emby Tag New Flavor";
const TELEGRAM: &str = "✈️Telegram";
const SWITCH: &str = "🎮Switch";
const GITHUB: &str = "🐱Github";
const MICROSOFT: &str = "🖥️Microsoft";
const STEAM: &str = "🍜Steam";
const YOUTUBE: &str = "📺YouTube";
const AMAZON: &str = "📺Amazon";
const OPENAI: &str = "🤖OpenAI";
const SPOTIFY: &str = "🎧Spotify";
const REDDIT: &str = "👽Reddit";
const PROXY_CONVERTER: &str = "✨订阅转换";
const IP_CHECK: &str = "📞IP检查";
const SELF_HOSTED: &str = "Self host servers";
const XIAOHONGSHU: &str = "小红书";
const ZHIHU: &str = "知乎";
const QQ: &str = "QQ";
const UNCOMMON: &str = "小众节点";

const EMBY_NODE: &str = "🕹️Crack Emby";
const CONVERTER_NODE: &str = "✨Proxy Convert (Local)";
const SELF_HOSTED_NODE: &str = "自建服务器2深圳";

const STREAM_MEDIA_PREFIX: &str = "📺";
/// Probe interval of the telegram url-test group
const TELEGRAM_INTERVAL: u32 = 300;

const SEMPORIA_BASE: &str = "https://raw.githubusercontent.com/Semporia/Clash/master/Rule/";
const SEMPORIA_INTERVAL: u32 = 3600;
const LOYALSOLDIER_BASE: &str = "https://cdn.jsdelivr.net/gh/Loyalsoldier/clash-rules@release/";
const LOYALSOLDIER_INTERVAL: u32 = 86400;

fn tag(country: Country) -> String {
    country.group_tag()
}

/// Classical rule list from Semporia/Clash, cached under a lowercased name.
fn semporia(key: &str) -> RuleProvider {
    RuleProvider::http(
        format!("{}{}.yaml", SEMPORIA_BASE, key),
        format!("./ruleset/{}.yaml", key.to_lowercase()),
        SEMPORIA_INTERVAL,
        RuleBehavior::Classical,
    )
}

/// Domain or CIDR list from Loyalsoldier/clash-rules.
fn loyalsoldier(key: &str, behavior: RuleBehavior) -> RuleProvider {
    RuleProvider::http(
        format!("{}{}.txt", LOYALSOLDIER_BASE, key),
        format!("./ruleset/{}.yaml", key),
        LOYALSOLDIER_INTERVAL,
        behavior,
    )
}

fn provider(name: &str, provider: RuleProvider, chain: Option<&str>) -> ProviderEntry {
    ProviderEntry {
        name: name.to_string(),
        provider,
        chain: chain.map(str::to_string),
    }
}

fn block(name: &'static str, rules: Vec<Rule>) -> RuleBlock {
    RuleBlock { name, rules }
}

/// Country tags of the usual long-haul exits plus extra members.
fn hk_sg_us(extra: &[&str]) -> Vec<String> {
    [Country::HK, Country::SG, Country::US]
        .into_iter()
        .map(tag)
        .chain(extra.iter().map(|s| s.to_string()))
        .collect()
}

impl PolicyTemplate {
    /// The stock template.
    pub fn standard() -> Self {
        PolicyTemplate {
            countries: vec![
                CountryEntry::required(Country::HK),
                CountryEntry::required(Country::TW),
                CountryEntry::required(Country::JP),
                CountryEntry::required(Country::SG),
                CountryEntry::required(Country::US),
                CountryEntry::required(Country::GB),
                CountryEntry::required(Country::FR),
                CountryEntry::required(Country::DE),
                CountryEntry::optional(Country::TH),
                CountryEntry::optional(Country::KR),
                CountryEntry::optional(Country::IS),
            ],
            grand: GRAND.to_string(),
            all_nodes: ALL_NODES.to_string(),
            leftover: LEFTOVER.to_string(),
            self_hosted: SELF_HOSTED.to_string(),
            static_groups: static_groups(),
            user_nodes: user_nodes(),
            rule_blocks: rule_blocks(),
            stream_media: vec![
                StreamMedia {
                    key: "Hulu",
                    countries: vec![Country::US],
                },
                StreamMedia {
                    key: "Netflix",
                    countries: vec![Country::SG, Country::JP, Country::HK],
                },
                StreamMedia {
                    key: "Pornhub",
                    countries: vec![Country::US, Country::HK],
                },
                StreamMedia {
                    key: "Bilibili",
                    countries: vec![Country::TW, Country::HK],
                },
            ],
            stream_media_prefix: STREAM_MEDIA_PREFIX,
            providers: providers(),
        }
    }
}

fn static_groups() -> Vec<ProxyGroup> {
    vec![
        ProxyGroup::select(REJECT_GROUP, [REJECT, DIRECT]),
        ProxyGroup::select(LEFTOVER, [DIRECT, GRAND, SELF_HOSTED]),
        ProxyGroup::select(MINECRAFT, [DIRECT, GRAND]),
        ProxyGroup::select(APPLE, [DIRECT, GRAND]),
        ProxyGroup::select(EMBY_UNLOCK, [DIRECT, EMBY_NODE]),
        ProxyGroup::select(
            EMBY_TAG,
            [DIRECT.to_string(), tag(Country::HK), tag(Country::JP)],
        ),
        ProxyGroup::url_test(TELEGRAM, TELEGRAM_INTERVAL, hk_sg_us(&[])),
        ProxyGroup::select(SWITCH, [DIRECT.to_string(), tag(Country::JP)]),
        ProxyGroup::select(GITHUB, hk_sg_us(&[DIRECT])),
        ProxyGroup::select(MICROSOFT, hk_sg_us(&[DIRECT])),
        ProxyGroup::select(STEAM, hk_sg_us(&[DIRECT])),
        ProxyGroup::select(YOUTUBE, hk_sg_us(&[GRAND, DIRECT])),
        ProxyGroup::select(AMAZON, [tag(Country::US)]),
        ProxyGroup::select(
            OPENAI,
            [tag(Country::US), tag(Country::JP), tag(Country::SG), GRAND.to_string()],
        ),
        ProxyGroup::select(SPOTIFY, [GRAND, DIRECT]),
        ProxyGroup::select(REDDIT, [GRAND, DIRECT]),
        ProxyGroup::select(PROXY_CONVERTER, [DIRECT, CONVERTER_NODE]),
        ProxyGroup::select(IP_CHECK, [DIRECT, GRAND]),
        ProxyGroup::select(SELF_HOSTED, [SELF_HOSTED_NODE]),
        ProxyGroup::select(XIAOHONGSHU, [DIRECT, UNCOMMON, GRAND]),
        ProxyGroup::select(ZHIHU, [DIRECT, UNCOMMON, GRAND]),
        ProxyGroup::select(QQ, [DIRECT, SELF_HOSTED, GRAND]),
        ProxyGroup::select(
            UNCOMMON,
            [Country::TH, Country::KR, Country::IS].into_iter().map(tag),
        ),
    ]
}

fn user_nodes() -> Vec<Node> {
    vec![
        Node::new(EMBY_NODE, NodeType::Http)
            .endpoint("203.0.113.10", 29967)
            .udp(true),
        Node::new(CONVERTER_NODE, NodeType::Http).endpoint("127.0.0.1", 39923),
        Node::new(SELF_HOSTED_NODE, NodeType::Shadowsocks)
            .endpoint("203.0.113.20", 8388)
            .credentials("chacha20-ietf-poly1305", "change-me")
            .udp(true)
            .tfo(true),
    ]
}

fn rule_blocks() -> Vec<RuleBlock> {
    vec![
        block(
            "nintendo",
            vec![
                Rule::domain_suffix("stat.ink", SWITCH),
                Rule::domain_suffix("nintendo.net", SWITCH),
                Rule::domain_suffix("nintendo.com", SWITCH),
                Rule::domain_suffix("s3-us-west-2.amazonaws.com", SWITCH),
            ],
        ),
        block(
            "emby",
            vec![
                Rule::domain_suffix("mb3admin.com", EMBY_UNLOCK),
                Rule::domain_suffix("tagemby.embylianmeng.com", EMBY_TAG),
            ],
        ),
        block(
            "proxy-converter",
            vec![
                Rule::domain("subscribe.hlasw.com", PROXY_CONVERTER),
                Rule::domain("subscribe.tagonline.asia", PROXY_CONVERTER),
            ],
        ),
        block(
            "special",
            vec![
                Rule::domain("cip.cc", IP_CHECK),
                Rule::domain("ipinfo.io", IP_CHECK),
            ],
        ),
        block(
            "minecraft",
            vec![Rule::domain_keyword("minecraft", MINECRAFT)],
        ),
        block(
            "xiaohongshu",
            vec![Rule::domain_suffix("xiaohongshu.com", XIAOHONGSHU)],
        ),
        block("zhihu", vec![Rule::domain_suffix("zhihu.com", ZHIHU)]),
        block("qq", vec![Rule::domain_suffix("qq.com", QQ)]),
        block("openai", vec![Rule::domain_suffix("openai.com", OPENAI)]),
        block("reddit", vec![Rule::domain_suffix("reddit.com", REDDIT)]),
        block(
            "spotify",
            vec![
                Rule::domain_suffix("spotify.com", SPOTIFY),
                Rule::domain_suffix("spotifycdn.com", SPOTIFY),
            ],
        ),
    ]
}

fn providers() -> Vec<ProviderEntry> {
    use RuleBehavior::{Domain, IpCidr};

    vec![
        provider("microsoft", semporia("Microsoft"), Some(MICROSOFT)),
        provider("github", semporia("GitHub"), Some(GITHUB)),
        provider("steam", semporia("Steam"), Some(STEAM)),
        provider("youtube", semporia("YouTube"), Some(YOUTUBE)),
        provider("amazon", semporia("Amazon"), Some(AMAZON)),
        provider("reject", loyalsoldier("reject", Domain), Some(REJECT_GROUP)),
        provider("icloud", loyalsoldier("icloud", Domain), Some(DIRECT)),
        provider("apple", loyalsoldier("apple", Domain), Some(APPLE)),
        provider("google", loyalsoldier("google", Domain), Some(DIRECT)),
        provider("proxy", loyalsoldier("proxy", Domain), Some(GRAND)),
        provider("direct", loyalsoldier("direct", Domain), Some(DIRECT)),
        provider("private", loyalsoldier("private", Domain), Some(DIRECT)),
        provider("gfw", loyalsoldier("gfw", Domain), None),
        provider("greatfire", loyalsoldier("greatfire", Domain), None),
        provider("tld-not-cn", loyalsoldier("tld-not-cn", Domain), None),
        provider("telegramcidr", loyalsoldier("telegramcidr", IpCidr), Some(TELEGRAM)),
        provider("cncidr", loyalsoldier("cncidr", IpCidr), None),
        provider("lancidr", loyalsoldier("lancidr", IpCidr), None),
    ]
}
