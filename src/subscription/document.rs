//! # 订阅配置文档
//!
//! Clash 订阅 YAML 的最小结构：`proxies`、`proxy-groups`、`rules`。
//! 其余顶层字段、节点和代理组的其余字段都原样保留（包括顺序）。

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::Error;

/// 订阅配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    /// 未建模的顶层字段（port、dns 等），输出时排在最前面
    #[serde(flatten)]
    pub extra: Mapping,
    pub proxies: Vec<Proxy>,
    /// 第一个代理组是默认代理组
    #[serde(rename = "proxy-groups")]
    pub proxy_groups: Vec<ProxyGroup>,
    pub rules: Vec<String>,
}

/// 代理节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proxy {
    pub name: String,
    #[serde(flatten)]
    pub extra: Mapping,
}

/// 代理组
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyGroup {
    pub name: String,
    #[serde(flatten)]
    pub extra: Mapping,
}

impl SubscriptionConfig {
    /// 默认代理组及其后的其余代理组
    pub fn split_default_group(&self) -> Result<(&ProxyGroup, &[ProxyGroup]), Error> {
        self.proxy_groups
            .split_first()
            .ok_or(Error::ConfigInvariant)
    }

    /// 全部节点名，保持原顺序
    pub fn proxy_names(&self) -> Vec<&str> {
        self.proxies.iter().map(|p| p.name.as_str()).collect()
    }
}

impl ProxyGroup {
    /// 创建 `select` 类型的代理组
    pub fn select(name: &str, members: Vec<String>) -> Self {
        let mut extra = Mapping::new();
        extra.insert(Value::from("type"), Value::from("select"));
        extra.insert(
            Value::from("proxies"),
            Value::Sequence(members.into_iter().map(Value::from).collect()),
        );

        Self {
            name: name.to_string(),
            extra,
        }
    }

    /// 代理组类型（select、url-test 等）
    pub fn kind(&self) -> Option<&str> {
        self.extra.get("type").and_then(Value::as_str)
    }

    /// 代理组成员名
    pub fn members(&self) -> Vec<&str> {
        self.extra
            .get("proxies")
            .and_then(Value::as_sequence)
            .map(|seq| seq.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

// ========================================
// YAML 编解码
// ========================================

/// 解析订阅 YAML
pub fn parse_document(text: &str) -> Result<SubscriptionConfig, Error> {
    serde_yaml::from_str(text).map_err(|e| Error::Document(e.to_string()))
}

/// 序列化为 YAML
pub fn to_document(config: &SubscriptionConfig) -> Result<String, Error> {
    serde_yaml::to_string(config).map_err(|e| Error::Document(e.to_string()))
}

// ========================================
// 测试模块
// ========================================
#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
mixed-port: 7890
mode: rule
proxies:
  - { name: "A-US", type: ss, server: a.example.com, port: 443 }
  - { name: "B-JP", type: trojan, server: b.example.com, port: 443 }
proxy-groups:
  - { name: "Proxy", type: select, proxies: ["A-US", "B-JP"] }
  - { name: "Auto", type: url-test, proxies: ["A-US", "B-JP"], interval: 300 }
rules:
  - MATCH,Proxy
"#;

    #[test]
    fn test_parse() {
        let config = parse_document(SAMPLE).unwrap();
        assert_eq!(config.proxy_names(), vec!["A-US", "B-JP"]);
        assert_eq!(config.proxy_groups[0].kind(), Some("select"));
        assert_eq!(config.proxy_groups[1].members(), vec!["A-US", "B-JP"]);
        assert_eq!(config.rules, vec!["MATCH,Proxy"]);
        assert_eq!(config.extra.get("mixed-port"), Some(&Value::from(7890)));

        let (default, rest) = config.split_default_group().unwrap();
        assert_eq!(default.name, "Proxy");
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn test_unknown_fields_survive() {
        let config = parse_document(SAMPLE).unwrap();
        let text = to_document(&config).unwrap();

        assert!(text.contains("mixed-port: 7890"));
        assert!(text.contains("server: b.example.com"));
        assert!(text.contains("interval: 300"));
        // 未建模的顶层字段排在最前面
        assert!(text.find("mode: rule").unwrap() < text.find("proxies:").unwrap());

        assert_eq!(parse_document(&text).unwrap(), config);
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            parse_document("proxies: [unclosed"),
            Err(Error::Document(_))
        ));
        // 缺少 proxy-groups
        assert!(matches!(
            parse_document("proxies: []\nrules: []\n"),
            Err(Error::Document(_))
        ));
    }

    #[test]
    fn test_empty_groups_is_invariant_error() {
        let config = parse_document("proxies: []\nproxy-groups: []\nrules: []\n").unwrap();
        assert!(matches!(
            config.split_default_group(),
            Err(Error::ConfigInvariant)
        ));
    }
}
