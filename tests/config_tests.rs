use assert_matches::assert_matches;
use boxsmith::config::{Config, FilterMode, ProtocolOptions, RuleType, TransportOptions};
use boxsmith::error::ConfigError;
use boxsmith::r#const::{http_client_limits, rule_set, settings_defaults};
use std::io::Write;
use tempfile::NamedTempFile;

// 辅助函数：创建临时配置文件
fn create_temp_config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_minimal_config_defaults() {
    let config_content = r#"
nodes:
  - tag: "HK 01"
    type: shadowsocks
    server: hk.example.com
    server_port: 8388
    country: hk
    extra:
      method: aes-128-gcm
      password: secret
"#;

    let file = create_temp_config_file(config_content);
    let result = Config::from_file(file.path());
    assert!(
        result.is_ok(),
        "Failed to load valid config: {:?}",
        result.err()
    );
    let config = result.unwrap();
    let model = &config.model;

    // 验证默认设置
    assert_eq!(model.settings.mixed_port, settings_defaults::MIXED_PORT);
    assert_eq!(model.settings.clash_api_port, settings_defaults::CLASH_API_PORT);
    assert_eq!(model.settings.ruleset_base_url, settings_defaults::RULESET_BASE_URL);
    assert_eq!(model.settings.final_outbound, "Proxy");
    assert!(!model.settings.allow_lan);
    assert!(!model.settings.tun_enabled);
    assert!(model.settings.github_proxy().is_none());
    assert!(model.settings.clash_api_secret().is_none());

    // 验证下载配置默认值
    assert_eq!(
        config.download.http_client.connect_timeout,
        http_client_limits::DEFAULT_CONNECT_TIMEOUT
    );
    assert!(config.download.retry.is_none());
    assert_eq!(config.download.max_size, rule_set::DEFAULT_MAX_SIZE);

    // 国家代码被规范为大写
    assert_eq!(model.nodes.len(), 1);
    assert_eq!(model.nodes[0].country.as_deref(), Some("HK"));
    assert_matches!(
        &model.nodes[0].protocol,
        Some(ProtocolOptions::Shadowsocks(ss)) if ss.method.as_deref() == Some("aes-128-gcm")
    );
}

#[test]
fn test_full_model_loading() {
    let config_content = r#"
settings:
  mixed_port: 7890
  allow_lan: true
  clash_api_secret: "s3cret"
  tun_enabled: true
  github_proxy: "https://ghproxy.example.com/"
nodes:
  - tag: "vmess-ws"
    type: vmess
    server: v.example.com
    server_port: 443
    extra:
      uuid: "b831381d-6324-4d53-ad4f-8cda48b30811"
      alter_id: 0
      tls:
        enabled: true
        server_name: v.example.com
      transport:
        type: ws
        path: "/ws?ed=2048"
        headers:
          Host: v.example.com
  - tag: "future"
    type: wireguard
    server: wg.example.com
    server_port: 51820
filters:
  - name: "Streaming"
    enabled: true
    mode: urltest
    include: ["netflix"]
rules:
  - rule_type: domain_suffix
    values: ["example.com"]
    outbound: DIRECT
    enabled: true
rule_groups:
  - name: "Google"
    enabled: true
    outbound: Proxy
    site_rules: ["google"]
    ip_rules: ["google"]
download:
  http_client:
    connect_timeout: 10
    request_timeout: 30
  retry:
    attempts: 3
    delay: 1
"#;

    let config = Config::from_yaml(config_content).unwrap();
    let model = &config.model;

    assert_eq!(model.settings.mixed_port, 7890);
    assert_eq!(model.settings.clash_api_secret(), Some("s3cret"));
    assert_eq!(
        model.settings.github_proxy(),
        Some("https://ghproxy.example.com/")
    );

    // 未知协议保留但没有协议配置
    assert_eq!(model.nodes.len(), 2);
    assert!(model.nodes[1].protocol.is_none());
    assert_eq!(model.nodes[1].kind, "wireguard");

    // vmess 字段包只解析一次
    match &model.nodes[0].protocol {
        Some(ProtocolOptions::VMess(vmess)) => {
            assert_eq!(vmess.alter_id, 0);
            let tls = vmess.tls.as_ref().unwrap();
            assert!(tls.enabled);
            assert_eq!(tls.server_name.as_deref(), Some("v.example.com"));
            assert_matches!(
                &vmess.transport,
                Some(TransportOptions::WebSocket { path: Some(path), headers })
                    if path == "/ws?ed=2048" && headers.get("Host").map(String::as_str) == Some("v.example.com")
            );
        }
        other => panic!("Unexpected protocol: {:?}", other),
    }

    // urltest 别名
    assert_eq!(model.filters[0].mode, FilterMode::UrlTest);
    assert_eq!(model.rules[0].rule_type, RuleType::DomainSuffix);
    assert_eq!(model.rule_groups[0].site_rules, vec!["google"]);

    let retry = config.download.retry.as_ref().unwrap();
    assert_eq!(retry.attempts, 3);
    assert_eq!(config.download.http_client.request_timeout, 30);
}

#[test]
fn test_wrong_shaped_fields_are_skipped() {
    let config_content = r#"
nodes:
  - tag: "vless"
    type: vless
    server: vl.example.com
    server_port: 443
    extra:
      uuid: 12345
      flow: ""
      tls:
        enabled: "yes"
        server_name: vl.example.com
        reality:
          enabled: false
          public_key: "pk"
"#;

    let config = Config::from_yaml(config_content).unwrap();
    match &config.model.nodes[0].protocol {
        Some(ProtocolOptions::VLess(vless)) => {
            assert!(vless.uuid.is_none());
            assert!(vless.flow.is_none());
            let tls = vless.tls.as_ref().unwrap();
            assert!(!tls.enabled);
            assert!(tls.reality.is_none());
        }
        other => panic!("Unexpected protocol: {:?}", other),
    }
}

#[test]
fn test_duplicate_node_tags_rejected() {
    let config_content = r#"
nodes:
  - tag: "same"
    type: trojan
    server: a.example.com
    server_port: 443
  - tag: "same"
    type: trojan
    server: b.example.com
    server_port: 443
"#;

    let result = Config::from_yaml(config_content);
    assert_matches!(result, Err(ConfigError::ValidationError(message)) if message.contains("unique"));
}

#[test]
fn test_invalid_values_rejected() {
    // 端口为 0
    let zero_port = r#"
nodes:
  - tag: "zero"
    type: trojan
    server: a.example.com
    server_port: 0
"#;
    assert_matches!(
        Config::from_yaml(zero_port),
        Err(ConfigError::ValidationError(_))
    );

    // 无效的规则集地址
    let bad_url = r#"
settings:
  ruleset_base_url: "not a url"
"#;
    assert_matches!(
        Config::from_yaml(bad_url),
        Err(ConfigError::ValidationError(_))
    );

    // 无效的 GitHub 代理
    let bad_proxy = r#"
settings:
  github_proxy: "::::"
"#;
    assert_matches!(
        Config::from_yaml(bad_proxy),
        Err(ConfigError::ValidationError(_))
    );

    // 超出范围的连接超时
    let bad_timeout = r#"
download:
  http_client:
    connect_timeout: 0
    request_timeout: 30
"#;
    assert_matches!(
        Config::from_yaml(bad_timeout),
        Err(ConfigError::ValidationError(_))
    );

    // 空的过滤器名称
    let empty_filter = r#"
filters:
  - name: ""
    enabled: true
"#;
    assert_matches!(
        Config::from_yaml(empty_filter),
        Err(ConfigError::ValidationError(_))
    );
}

#[test]
fn test_unknown_rule_type_rejected() {
    let config_content = r#"
rules:
  - rule_type: process_name
    values: ["curl"]
    outbound: DIRECT
    enabled: true
"#;

    assert_matches!(
        Config::from_yaml(config_content),
        Err(ConfigError::ParseError(_))
    );
}

#[test]
fn test_missing_file() {
    let result = Config::from_file("/nonexistent/boxsmith.yaml");
    assert_matches!(result, Err(ConfigError::LoadError(_)));
}

#[test]
fn test_unrecognized_filter_mode_is_select() {
    let config_content = r#"
filters:
  - name: "Fallback"
    enabled: true
    mode: fallback
  - name: "Balanced"
    enabled: true
    mode: load-balance
  - name: "Tested"
    enabled: true
    mode: URLTest
"#;

    let config = Config::from_yaml(config_content).unwrap();
    let modes: Vec<FilterMode> = config.model.filters.iter().map(|f| f.mode).collect();
    assert_eq!(
        modes,
        vec![FilterMode::Select, FilterMode::Select, FilterMode::UrlTest]
    );
}

#[test]
fn test_reserved_outbound_names_rejected() {
    let node = r#"
nodes:
  - tag: "JP 01"
    type: trojan
    server: a.example.com
    server_port: 443
    country: jp
"#;

    // 过滤器占用内置分组名
    let filter_named_auto = format!(
        "{}filters:\n  - name: \"Auto\"\n    enabled: true\n",
        node
    );
    assert_matches!(
        Config::from_yaml(&filter_named_auto),
        Err(ConfigError::ValidationError(message)) if message.contains("'Auto' is reserved")
    );

    // 规则组占用 Final
    let rule_group_named_final = format!(
        "{}rule_groups:\n  - name: \"Final\"\n    enabled: true\n    outbound: Proxy\n",
        node
    );
    assert_matches!(
        Config::from_yaml(&rule_group_named_final),
        Err(ConfigError::ValidationError(message)) if message.contains("'Final' is reserved")
    );

    // 节点标签占用内置出站
    let node_named_direct = node.replace("JP 01", "DIRECT");
    assert_matches!(
        Config::from_yaml(&node_named_direct),
        Err(ConfigError::ValidationError(message)) if message.contains("'DIRECT' is reserved")
    );

    // 过滤器与国家组同名
    let filter_named_country = format!(
        "{}filters:\n  - name: \"🇯🇵 Japan\"\n    enabled: true\n",
        node
    );
    assert!(Config::from_yaml(&filter_named_country).is_err());
}

#[test]
fn test_outbound_names_unique_across_kinds() {
    let shared = r#"
nodes:
  - tag: "Streaming"
    type: trojan
    server: a.example.com
    server_port: 443
filters:
  - name: "Streaming"
    enabled: true
"#;
    assert_matches!(
        Config::from_yaml(shared),
        Err(ConfigError::ValidationError(message)) if message.contains("'Streaming' is not unique")
    );

    let filter_and_rule_group = r#"
filters:
  - name: "Media"
    enabled: true
rule_groups:
  - name: "Media"
    enabled: true
    outbound: Proxy
"#;
    assert!(Config::from_yaml(filter_and_rule_group).is_err());

    // 未启用的条目不会生成分组
    let disabled = r#"
filters:
  - name: "Auto"
    enabled: false
rule_groups:
  - name: "Media"
    enabled: false
    outbound: Proxy
  - name: "Media"
    enabled: true
    outbound: Proxy
"#;
    assert!(Config::from_yaml(disabled).is_ok());
}
