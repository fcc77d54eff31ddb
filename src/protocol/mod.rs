mod clash;
mod singbox;
mod transport;

pub use self::clash::{
    ClashEncoder, ClashEndpoint, ClashGrpcOpts, ClashProxy, ClashTransport, ClashWsOpts,
};
pub use self::singbox::{
    Endpoint, OutboundTls, ProxyOutbound, SingBoxEncoder, V2RayTransport,
};
pub use self::transport::{normalize_ws_path, WsPath};

use crate::config::Node;
use tracing::debug;

/// 协议编码器特征，每种目标格式一个实现
pub trait ProxyEncoder {
    /// 编码后的代理条目类型
    type Stanza;

    /// 编码单个节点，未知协议返回 `None`
    fn encode(&self, node: &Node) -> Option<Self::Stanza>;

    /// 按声明顺序编码所有节点，跳过无法编码的节点
    fn encode_all(&self, nodes: &[Node]) -> Vec<Self::Stanza> {
        nodes
            .iter()
            .filter_map(|node| {
                let stanza = self.encode(node);
                if stanza.is_none() {
                    debug!(
                        "Skipping node '{}' with unsupported type '{}'",
                        node.tag, node.kind
                    );
                }
                stanza
            })
            .collect()
    }
}

// 节点是否可以被编码
pub fn is_encodable(node: &Node) -> bool {
    node.protocol.is_some()
}
