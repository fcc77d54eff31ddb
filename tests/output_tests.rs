use assert_matches::assert_matches;
use boxsmith::config::{Config, ModelSnapshot};
use boxsmith::error::CompileError;
use boxsmith::output::{compile, CompileOptions, ExportFormat};
use serde_json::Value;
use std::path::PathBuf;

const MODEL: &str = r#"
settings:
  mixed_port: 7890
  allow_lan: true
  clash_api_port: 9090
  clash_api_secret: "s3cret"
  github_proxy: "https://ghproxy.example.com/"
nodes:
  - tag: "HK 01"
    type: shadowsocks
    server: hk.example.com
    server_port: 8388
    country: HK
    extra:
      method: aes-128-gcm
      password: pw
  - tag: "JP vmess"
    type: vmess
    server: jp.example.com
    server_port: 443
    country: JP
    extra:
      uuid: "u"
      tls:
        enabled: true
      transport:
        type: ws
        path: "/ws?ed=2048"
  - tag: "future"
    type: wireguard
    server: wg.example.com
    server_port: 51820
filters:
  - name: "Japan"
    enabled: true
    include_countries: ["JP"]
rules:
  - rule_type: domain_suffix
    values: ["example.com"]
    outbound: DIRECT
    enabled: true
  - rule_type: ip_cidr
    values: ["10.0.0.0/8"]
    outbound: DIRECT
    enabled: true
  - rule_type: port
    values: ["22", "8000:9000", "http"]
    outbound: DIRECT
    enabled: true
rule_groups:
  - name: "Google"
    enabled: true
    outbound: Proxy
    site_rules: ["google"]
    ip_rules: ["google"]
"#;

fn model() -> ModelSnapshot {
    Config::from_yaml(MODEL).unwrap().model
}

fn singbox(snapshot: &ModelSnapshot, options: &CompileOptions) -> Value {
    let document = compile(ExportFormat::SingBox, snapshot, options).unwrap();
    serde_json::from_str(&document).unwrap()
}

fn tags(document: &Value) -> Vec<String> {
    document["outbounds"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["tag"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_export_format_parsing() {
    assert_eq!("singbox".parse::<ExportFormat>().unwrap(), ExportFormat::SingBox);
    assert_eq!("sing-box".parse::<ExportFormat>().unwrap(), ExportFormat::SingBox);
    assert_eq!("Clash".parse::<ExportFormat>().unwrap(), ExportFormat::Clash);
    assert_matches!(
        "surge".parse::<ExportFormat>(),
        Err(CompileError::UnsupportedFormat(format)) if format == "surge"
    );
}

#[test]
fn test_empty_nodes_fail_fast() {
    let snapshot = ModelSnapshot::default();
    for format in [ExportFormat::SingBox, ExportFormat::Clash] {
        assert_matches!(
            compile(format, &snapshot, &CompileOptions::default()),
            Err(CompileError::NoNodes)
        );
    }

    // 只有未知协议的节点同样视为无节点
    let only_unknown = Config::from_yaml(
        r#"
nodes:
  - tag: "wg"
    type: wireguard
    server: wg.example.com
    server_port: 51820
"#,
    )
    .unwrap()
    .model;
    assert_matches!(
        compile(ExportFormat::SingBox, &only_unknown, &CompileOptions::default()),
        Err(CompileError::NoNodes)
    );
}

#[test]
fn test_singbox_document_sections() {
    let document = singbox(&model(), &CompileOptions::default());

    assert!(document["dns"].is_object());
    assert!(document["inbounds"].is_array());
    assert!(document["outbounds"].is_array());
    assert!(document["route"].is_object());

    assert_eq!(document["dns"]["final"], "proxy");
    assert_eq!(document["inbounds"][0]["type"], "mixed");
    assert_eq!(document["inbounds"][0]["listen"], "0.0.0.0");
    assert_eq!(document["inbounds"][0]["listen_port"], 7890);
    // 未启用 TUN
    assert_eq!(document["inbounds"].as_array().unwrap().len(), 1);

    let outbound_tags = tags(&document);
    assert_eq!(outbound_tags[0], "Proxy");
    assert!(outbound_tags.contains(&"HK 01".to_string()));
    assert!(!outbound_tags.contains(&"future".to_string()));
    let n = outbound_tags.len();
    assert_eq!(outbound_tags[n - 2], "DIRECT");
    assert_eq!(outbound_tags[n - 1], "REJECT");

    // 分组位于节点之前
    let final_index = outbound_tags.iter().position(|t| t == "Final").unwrap();
    let node_index = outbound_tags.iter().position(|t| t == "HK 01").unwrap();
    assert!(final_index < node_index);

    let proxy = &document["outbounds"][0];
    assert_eq!(proxy["type"], "selector");
    assert_eq!(proxy["outbounds"][0], "Auto");

    let final_group = &document["outbounds"][final_index];
    assert_eq!(final_group["default"], "Proxy");

    // vmess 早期数据
    let vmess = document["outbounds"]
        .as_array()
        .unwrap()
        .iter()
        .find(|o| o["tag"] == "JP vmess")
        .unwrap();
    assert_eq!(vmess["transport"]["path"], "/ws");
    assert_eq!(vmess["transport"]["max_early_data"], 2048);

    assert_eq!(document["route"]["final"], "Final");
    assert_eq!(document["experimental"]["clash_api"]["external_controller"], "0.0.0.0:9090");
    assert_eq!(document["experimental"]["clash_api"]["secret"], "s3cret");
}

#[test]
fn test_singbox_route_rules() {
    let document = singbox(&model(), &CompileOptions::default());
    let rules = document["route"]["rules"].as_array().unwrap();

    assert_eq!(rules[0]["action"], "sniff");
    assert_eq!(rules[1]["action"], "hijack-dns");
    assert_eq!(rules[2]["domain_suffix"][0], "example.com");
    assert_eq!(rules[3]["ip_cidr"][0], "10.0.0.0/8");
    assert_eq!(rules[4]["port"][0], 22);
    assert_eq!(rules[5]["port_range"][0], "8000:9000");
    // "http" 不是合法端口，被跳过
    assert_eq!(rules[6]["rule_set"][0], "geosite-google");
    assert_eq!(rules[6]["outbound"], "Google");
    assert_eq!(rules[7]["rule_set"][0], "geoip-google");
    assert_eq!(rules.len(), 8);
}

#[test]
fn test_singbox_remote_rule_sets() {
    let document = singbox(&model(), &CompileOptions::default());
    let rule_sets = document["route"]["rule_set"].as_array().unwrap();

    // 按标签排序
    assert_eq!(rule_sets[0]["tag"], "geoip-google");
    assert_eq!(rule_sets[1]["tag"], "geosite-google");

    for entry in rule_sets {
        assert_eq!(entry["type"], "remote");
        assert_eq!(entry["format"], "binary");
        assert_eq!(entry["download_detour"], "DIRECT");
        assert!(entry.get("path").is_none());
        assert!(entry["url"]
            .as_str()
            .unwrap()
            .starts_with("https://ghproxy.example.com/"));
    }
}

#[test]
fn test_singbox_local_rule_sets() {
    let options = CompileOptions {
        mobile_mode: false,
        local_rule_set_dir: Some(PathBuf::from("/data/rulesets")),
    };
    let document = singbox(&model(), &options);

    for entry in document["route"]["rule_set"].as_array().unwrap() {
        assert_eq!(entry["type"], "local");
        assert!(entry.get("url").is_none());
        assert!(entry.get("download_detour").is_none());
        let path = entry["path"].as_str().unwrap();
        assert!(path.starts_with("/data/rulesets"));
        assert!(path.ends_with(".srs"));
    }
}

#[test]
fn test_singbox_mobile_mode() {
    let options = CompileOptions {
        mobile_mode: true,
        local_rule_set_dir: Some(PathBuf::from("/data/rulesets")),
    };
    let document = singbox(&model(), &options);

    // 移动端始终使用远程规则集
    for entry in document["route"]["rule_set"].as_array().unwrap() {
        assert_eq!(entry["type"], "remote");
    }

    let auto = document["outbounds"]
        .as_array()
        .unwrap()
        .iter()
        .find(|o| o["tag"] == "Auto")
        .unwrap();
    assert_eq!(auto["type"], "urltest");
    assert_eq!(auto["idle_timeout"], "30m");
    assert_eq!(
        document["experimental"]["clash_api"]["external_controller"],
        "127.0.0.1:9090"
    );

    // 非移动端没有空闲超时
    let desktop = singbox(&model(), &CompileOptions::default());
    let auto = desktop["outbounds"]
        .as_array()
        .unwrap()
        .iter()
        .find(|o| o["tag"] == "Auto")
        .unwrap();
    assert!(auto.get("idle_timeout").is_none());
}

#[test]
fn test_singbox_tun_inbound() {
    let mut snapshot = model();
    snapshot.settings.tun_enabled = true;
    snapshot.settings.allow_lan = false;

    let document = singbox(&snapshot, &CompileOptions::default());
    let inbounds = document["inbounds"].as_array().unwrap();
    assert_eq!(inbounds.len(), 2);
    assert_eq!(inbounds[0]["listen"], "127.0.0.1");
    assert_eq!(inbounds[1]["type"], "tun");
    assert_eq!(inbounds[1]["auto_route"], true);
}

#[test]
fn test_clash_document() {
    let document = compile(ExportFormat::Clash, &model(), &CompileOptions::default()).unwrap();
    let yaml: serde_yaml::Value = serde_yaml::from_str(&document).unwrap();

    assert_eq!(yaml["mixed-port"].as_u64(), Some(7890));
    assert_eq!(yaml["allow-lan"].as_bool(), Some(true));
    assert_eq!(yaml["mode"].as_str(), Some("rule"));
    assert_eq!(yaml["log-level"].as_str(), Some("info"));
    assert_eq!(yaml["external-controller"].as_str(), Some("0.0.0.0:9090"));
    assert_eq!(yaml["secret"].as_str(), Some("s3cret"));
    assert_eq!(yaml["dns"]["enhanced-mode"].as_str(), Some("fake-ip"));
    assert_eq!(
        yaml["dns"]["fallback-filter"]["geoip-code"].as_str(),
        Some("CN")
    );
    assert!(yaml.get("tun").is_none());

    let proxies = yaml["proxies"].as_sequence().unwrap();
    assert_eq!(proxies.len(), 2);
    assert_eq!(proxies[0]["type"].as_str(), Some("ss"));

    let groups = yaml["proxy-groups"].as_sequence().unwrap();
    assert_eq!(groups[0]["name"].as_str(), Some("Proxy"));
    assert_eq!(groups.last().unwrap()["name"].as_str(), Some("Final"));
    // Clash 分组没有 default 字段
    assert!(groups.iter().all(|g| g.get("default").is_none()));

    let rules: Vec<&str> = yaml["rules"]
        .as_sequence()
        .unwrap()
        .iter()
        .map(|r| r.as_str().unwrap())
        .collect();
    assert_eq!(rules[0], "DOMAIN-SUFFIX,example.com,DIRECT");
    assert_eq!(rules[1], "IP-CIDR,10.0.0.0/8,DIRECT,no-resolve");
    assert!(rules.contains(&"GEOSITE,google,Google"));
    assert_eq!(rules.last().copied(), Some("MATCH,Final"));
    assert_eq!(rules.iter().filter(|r| r.starts_with("MATCH")).count(), 1);
}

#[test]
fn test_clash_secret_and_tun_gating() {
    let mut snapshot = model();
    snapshot.settings.allow_lan = false;
    snapshot.settings.tun_enabled = true;

    let document = compile(ExportFormat::Clash, &snapshot, &CompileOptions::default()).unwrap();
    let yaml: serde_yaml::Value = serde_yaml::from_str(&document).unwrap();

    // 关闭局域网时不输出密钥
    assert!(yaml.get("secret").is_none());
    assert_eq!(yaml["tun"]["enable"].as_bool(), Some(true));
    assert_eq!(yaml["tun"]["stack"].as_str(), Some("system"));
    assert_eq!(yaml["tun"]["auto-route"].as_bool(), Some(true));
    assert_eq!(yaml["tun"]["auto-detect-interface"].as_bool(), Some(true));
}

#[test]
fn test_compilation_is_deterministic() {
    let snapshot = model();
    let options = CompileOptions::default();
    for format in [ExportFormat::SingBox, ExportFormat::Clash] {
        let first = compile(format, &snapshot, &options).unwrap();
        let second = compile(format, &snapshot, &options).unwrap();
        assert_eq!(first, second);
    }
}
