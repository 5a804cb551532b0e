//! Item records to clash nodes

use std::collections::BTreeMap;

use log::warn;

use crate::models::{Node, NodeType};
use crate::parser::explodes::{SsItem, SsrItem};

/// Plugin ids that clash knows as `obfs`.
const OBFS_PLUGIN_IDS: &[&str] = &["simple-obfs", "obfs-local"];

/// `server (port)`, used when a link carries no name.
fn fallback_name(server: &str, port: &str) -> String {
    format!("{} ({})", server, port)
}

/// Convert an `ss://` item. Returns `None` when the item has neither a
/// name nor a server, since no group could reference it.
pub fn ss_item_to_node(item: &SsItem) -> Option<Node> {
    let name = if item.name.is_empty() {
        if item.server.is_empty() {
            warn!("dropping unnamed ss item without server");
            return None;
        }
        fallback_name(&item.server, &item.port)
    } else {
        item.name.clone()
    };

    let mut node = Node::new(name, NodeType::Shadowsocks)
        .credentials(item.method.as_str(), item.password.as_str())
        .udp(true)
        .tfo(true);
    node.server = item.server.clone();
    node.port = item.port_number();

    if let Some((plugin, opts)) = translate_plugin(&item.plugins) {
        node.plugin = plugin;
        node.plugin_opts = opts;
    }

    Some(node)
}

/// SIP003 plugin map to clash `plugin` + `plugin-opts`. Only the obfs
/// family is understood, anything else is dropped.
fn translate_plugin(plugins: &BTreeMap<String, String>) -> Option<(String, BTreeMap<String, String>)> {
    let id = plugins.get("plugin")?;
    if !OBFS_PLUGIN_IDS.contains(&id.as_str()) {
        return None;
    }

    let mut opts = BTreeMap::new();
    if let Some(mode) = plugins.get("obfs") {
        opts.insert("mode".to_string(), mode.clone());
    }
    if let Some(host) = plugins.get("obfs-host") {
        opts.insert("host".to_string(), host.clone());
    }
    Some(("obfs".to_string(), opts))
}

/// Convert an `ssr://` item.
pub fn ssr_item_to_node(item: &SsrItem) -> Node {
    let name = if item.remarks.is_empty() {
        fallback_name(&item.server, &item.port.to_string())
    } else {
        item.remarks.clone()
    };

    let mut node = Node::new(name, NodeType::ShadowsocksR)
        .endpoint(item.server.as_str(), item.port)
        .credentials(item.method.as_str(), item.password.as_str())
        .udp(true);
    node.protocol = item.protocol.clone();
    node.protocol_param = item.protocol_param.clone();
    node.obfs = item.obfs.clone();
    node.obfs_param = item.obfs_param.clone();
    node
}
