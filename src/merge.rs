//! # 配置合并
//!
//! 把规则集应用到订阅配置上，生成新的配置。输入配置不会被修改。
//!
//! ## 合并结果
//! - `rules`: 全局规则 → 自定义组规则 → 原有规则
//!   （按首条匹配生效的客户端里，用户规则优先于订阅自带规则）
//! - `proxy-groups`: 默认代理组 → 自定义组 → 其余原有代理组
//! - `proxies` 及其余字段原样保留

use tracing::debug;

use crate::error::Error;
use crate::rule::directive::global_directives;
use crate::rule::group::{group_directives, selection_group};
use crate::rule::RuleSet;
use crate::subscription::SubscriptionConfig;

/// 合并规则集与订阅配置
///
/// 订阅配置没有任何代理组时返回 `Error::ConfigInvariant`，不产生部分结果。
pub fn merge(config: &SubscriptionConfig, rules: &RuleSet) -> Result<SubscriptionConfig, Error> {
    let (default_group, other_groups) = config.split_default_group()?;
    let default_name = default_group.name.as_str();

    let global = global_directives(rules, default_name);
    let grouped = group_directives(&rules.proxy_groups);
    debug!(
        default_group = default_name,
        global = global.len(),
        grouped = grouped.len(),
        "generated directives"
    );

    let mut merged_rules = Vec::with_capacity(global.len() + grouped.len() + config.rules.len());
    merged_rules.extend(global.iter().chain(grouped.iter()).map(ToString::to_string));
    merged_rules.extend(config.rules.iter().cloned());

    let proxy_names = config.proxy_names();
    let mut merged_groups =
        Vec::with_capacity(config.proxy_groups.len() + rules.proxy_groups.len());
    merged_groups.push(default_group.clone());
    merged_groups.extend(
        rules
            .proxy_groups
            .iter()
            .map(|group| selection_group(group, &proxy_names, default_name)),
    );
    merged_groups.extend(other_groups.iter().cloned());

    Ok(SubscriptionConfig {
        extra: config.extra.clone(),
        proxies: config.proxies.clone(),
        proxy_groups: merged_groups,
        rules: merged_rules,
    })
}

// ========================================
// 测试模块
// ========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Group;
    use crate::subscription::parse_document;

    const SAMPLE: &str = r#"
port: 7890
proxies:
  - { name: "A-US", type: ss }
  - { name: "B-JP", type: ss }
  - { name: "C-FR", type: ss }
proxy-groups:
  - { name: "Default", type: select, proxies: ["A-US", "B-JP", "C-FR"] }
  - { name: "Fallback", type: fallback, proxies: ["A-US", "B-JP"] }
rules:
  - GEOIP,CN,DIRECT
  - MATCH,Default
"#;

    fn sample() -> SubscriptionConfig {
        parse_document(SAMPLE).unwrap()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_merge_rules_order() {
        let rules = RuleSet {
            proxy_domains: strings(&["github.com"]),
            direct_ips: strings(&["192.168.0.0/24"]),
            proxy_groups: vec![Group {
                geo_sites: strings(&["netflix"]),
                ..Group::named("Netflix")
            }],
            ..Default::default()
        };

        let merged = merge(&sample(), &rules).unwrap();
        assert_eq!(
            merged.rules,
            vec![
                "DOMAIN-SUFFIX,github.com,Default",
                "IP-CIDR,192.168.0.0/24,DIRECT,no-resolve",
                "GEOSITE,netflix,Netflix",
                "GEOIP,CN,DIRECT",
                "MATCH,Default",
            ]
        );
    }

    #[test]
    fn test_directive_count() {
        let config = sample();
        let rules = RuleSet::example();
        let merged = merge(&config, &rules).unwrap();

        let global: usize = crate::rule::directive::GLOBAL_CATEGORIES
            .iter()
            .map(|&(direction, rule_type)| rules.values(direction, rule_type).len())
            .sum();
        let grouped: usize = rules
            .proxy_groups
            .iter()
            .map(|g| {
                g.domain_keywords.len() + g.domains.len() + g.geo_sites.len() + g.geo_ips.len()
            })
            .sum();

        assert_eq!(merged.rules.len(), config.rules.len() + global + grouped);
        // 原有规则总在最后
        assert_eq!(merged.rules[global + grouped..], config.rules[..]);
    }

    #[test]
    fn test_group_insertion() {
        let rules = RuleSet {
            proxy_groups: vec![Group {
                filters: strings(&["jp"]),
                ..Group::named("N")
            }],
            ..Default::default()
        };

        let merged = merge(&sample(), &rules).unwrap();
        let names: Vec<&str> = merged.proxy_groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Default", "N", "Fallback"]);
        assert_eq!(
            merged.proxy_groups[1].members(),
            vec!["B-JP", "Default", "DIRECT"]
        );
        assert_eq!(merged.proxy_groups[1].kind(), Some("select"));
    }

    #[test]
    fn test_empty_rule_set_is_identity() {
        let config = sample();
        let merged = merge(&config, &RuleSet::default()).unwrap();
        assert_eq!(merged, config);
    }

    #[test]
    fn test_input_untouched() {
        let config = sample();
        let before = config.clone();
        let merged = merge(&config, &RuleSet::example()).unwrap();

        assert_eq!(config, before);
        assert_ne!(merged, config);
        assert_eq!(merged.proxies, config.proxies);
        assert_eq!(merged.extra, config.extra);
    }

    #[test]
    fn test_no_proxy_groups() {
        let config = parse_document("proxies: []\nproxy-groups: []\nrules: []\n").unwrap();
        assert!(matches!(
            merge(&config, &RuleSet::example()),
            Err(Error::ConfigInvariant)
        ));
    }
}
