// 应用常量定义

//
// 出站名称常量
//

// 内置出站与固定分组名称
pub mod outbound_names {
    // 顶层选择器
    pub const PROXY: &str = "Proxy";
    // 全局自动测速组
    pub const AUTO: &str = "Auto";
    // 兜底选择器
    pub const FINAL: &str = "Final";
    // 直连出站
    pub const DIRECT: &str = "DIRECT";
    // 拦截出站
    pub const REJECT: &str = "REJECT";
    // 无国家代码节点的归类
    pub const OTHER: &str = "OTHER";
}

// 自动测速组默认值
pub mod url_test_defaults {
    // 默认探测地址
    pub const URL: &str = "https://www.gstatic.com/generate_204";
    // 默认探测间隔（秒）
    pub const INTERVAL: u32 = 300;
    // 默认容差（毫秒）
    pub const TOLERANCE: u32 = 50;
}

// WebSocket 早期数据
pub mod early_data {
    // 查询参数名
    pub const QUERY_KEY: &str = "ed";
    // 固定的早期数据头名
    pub const HEADER_NAME: &str = "Sec-WebSocket-Protocol";
    // 路径为空时的默认值
    pub const DEFAULT_PATH: &str = "/";
}

//
// 规则集常量
//

pub mod rule_set {
    // 同时进行的最大下载数
    pub const MAX_CONCURRENT_DOWNLOADS: usize = 5;
    // 本地规则集过期时间（秒）- 7天
    pub const STALE_AFTER_SECS: u64 = 7 * 24 * 60 * 60;
    // 规则集文件扩展名
    pub const EXTENSION: &str = "srs";
    // 临时文件后缀
    pub const TEMP_SUFFIX: &str = "tmp";
    // 规则集格式
    pub const FORMAT: &str = "binary";
    // geosite 标签前缀
    pub const GEOSITE_PREFIX: &str = "geosite";
    // geoip 标签前缀
    pub const GEOIP_PREFIX: &str = "geoip";
    // geoip 规则集相对于 base url 的目录
    pub const GEOIP_RELATIVE_DIR: &str = "../rule-set-geoip";
    // 默认本地目录
    pub const DEFAULT_DIR: &str = "./rulesets";
    // 默认最大文件大小（字节）- 20MB
    pub const DEFAULT_MAX_SIZE: usize = 20 * 1024 * 1024;
}

//
// 配置参数限制常量
//

// HTTP客户端配置限制
pub mod http_client_limits {
    // 默认连接超时（秒）
    pub const DEFAULT_CONNECT_TIMEOUT: u64 = 5;
    // 最小连接超时（秒）
    pub const MIN_CONNECT_TIMEOUT: u64 = 1;
    // 最大连接超时（秒）
    pub const MAX_CONNECT_TIMEOUT: u64 = 120;
    // 默认请求超时（秒）
    pub const DEFAULT_REQUEST_TIMEOUT: u64 = 60;
    // 最小请求超时（秒）
    pub const MIN_REQUEST_TIMEOUT: u64 = 1;
    // 最大请求超时（秒）
    pub const MAX_REQUEST_TIMEOUT: u64 = 1200;
    // 默认空闲超时（秒）
    pub const DEFAULT_IDLE_TIMEOUT: u64 = 10;
    // 最小空闲超时（秒）
    pub const MIN_IDLE_TIMEOUT: u64 = 5;
    // 最大空闲超时（秒）
    pub const MAX_IDLE_TIMEOUT: u64 = 1800;
    // 默认keepalive时间（秒）
    pub const DEFAULT_KEEPALIVE: u32 = 30;
    // 最小keepalive时间（秒）
    pub const MIN_KEEPALIVE: u32 = 5;
    // 最大keepalive时间（秒）
    pub const MAX_KEEPALIVE: u32 = 600;
}

// 重试配置限制
pub mod retry_limits {
    // 最小重试次数
    pub const MIN_ATTEMPTS: u32 = 1;
    // 最大重试次数
    pub const MAX_ATTEMPTS: u32 = 10;
    // 最小重试延迟（秒）
    pub const MIN_DELAY: u32 = 1;
    // 最大重试延迟（秒）
    pub const MAX_DELAY: u32 = 120;
}

// 全局设置默认值
pub mod settings_defaults {
    // 默认混合端口
    pub const MIXED_PORT: u16 = 2080;
    // 默认 Clash API 端口
    pub const CLASH_API_PORT: u16 = 9091;
    // 默认规则集地址
    pub const RULESET_BASE_URL: &str =
        "https://raw.githubusercontent.com/lyc8503/sing-box-rules/rule-set-geosite";
    // 默认代理 DNS
    pub const PROXY_DNS: &str = "https://1.1.1.1/dns-query";
    // 默认直连 DNS
    pub const DIRECT_DNS: &str = "https://223.5.5.5/dns-query";
}

//
// 输出格式常量
//

// Clash 配置默认值
pub mod clash_defaults {
    // 规则模式
    pub const MODE: &str = "rule";
    // 日志级别
    pub const LOG_LEVEL: &str = "info";
    // 外部控制器监听地址
    pub const CONTROLLER_HOST: &str = "0.0.0.0";

    // DNS
    pub mod dns {
        pub const ENHANCED_MODE: &str = "fake-ip";
        pub const FAKE_IP_RANGE: &str = "198.18.0.1/16";
        pub const FAKE_IP_FILTER: [&str; 3] = ["*.lan", "*.local", "localhost"];
        pub const DEFAULT_NAMESERVER: [&str; 2] = ["223.5.5.5", "119.29.29.29"];
        pub const NAMESERVER: [&str; 2] = [
            "https://dns.alidns.com/dns-query",
            "https://doh.pub/dns-query",
        ];
        pub const FALLBACK: [&str; 2] = ["https://1.1.1.1/dns-query", "https://8.8.8.8/dns-query"];
        pub const FALLBACK_GEOIP_CODE: &str = "CN";
        pub const FALLBACK_IPCIDR: [&str; 1] = ["240.0.0.0/4"];
    }

    // TUN
    pub mod tun {
        pub const STACK: &str = "system";
        pub const DNS_HIJACK: [&str; 1] = ["any:53"];
    }
}

// sing-box 配置默认值
pub mod singbox_defaults {
    // 日志级别
    pub const LOG_LEVEL: &str = "info";
    // 局域网监听地址
    pub const LISTEN_ANY: &str = "0.0.0.0";
    // 本机监听地址
    pub const LISTEN_LOOPBACK: &str = "127.0.0.1";
    // 入站标签
    pub const MIXED_INBOUND_TAG: &str = "mixed-in";
    pub const TUN_INBOUND_TAG: &str = "tun-in";
    // TUN 地址
    pub const TUN_ADDRESS: &str = "172.19.0.1/30";
    // TUN 协议栈
    pub const TUN_STACK: &str = "system";
    // DNS 服务器标签
    pub const DNS_PROXY_TAG: &str = "proxy";
    pub const DNS_DIRECT_TAG: &str = "direct";
    // 移动端测速组空闲超时
    pub const MOBILE_URL_TEST_IDLE_TIMEOUT: &str = "30m";
}

// VMess 协议默认值，两种格式共用
pub mod vmess_defaults {
    // 加密方式
    pub const SECURITY: &str = "auto";
}
