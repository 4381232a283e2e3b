//! # 规则集数据结构
//!
//! 规则集是用户的分流意图：十个全局分类（代理 / 直连 × 五种规则类型）
//! 加上若干自定义代理组。JSON 字段名沿用订阅转换链接里的载荷格式。

use serde::{Deserialize, Serialize};

use super::directive::{Direction, RuleType};

/// 用户规则集
///
/// 所有字段都必须出现在载荷中，缺字段的 token 视为损坏。
/// 序列内允许重复值，重复值会生成重复规则。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    pub proxy_domain_keywords: Vec<String>,
    pub proxy_domains: Vec<String>,
    #[serde(rename = "proxyIPs")]
    pub proxy_ips: Vec<String>,
    pub proxy_geo_sites: Vec<String>,
    #[serde(rename = "proxyGeoIPs")]
    pub proxy_geo_ips: Vec<String>,
    pub direct_domain_keywords: Vec<String>,
    pub direct_domains: Vec<String>,
    #[serde(rename = "directIPs")]
    pub direct_ips: Vec<String>,
    pub direct_geo_sites: Vec<String>,
    #[serde(rename = "directGeoIPs")]
    pub direct_geo_ips: Vec<String>,
    /// 自定义代理组，按顺序插入到默认代理组之后
    pub proxy_groups: Vec<Group>,
}

/// 自定义代理组
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    /// 组名，同时作为该组规则的目标
    pub name: String,
    /// 成员列表以 DIRECT 开头
    pub direct_first: bool,
    /// 节点名过滤（子串，不区分大小写）；为空时保留全部节点
    pub filters: Vec<String>,
    pub domain_keywords: Vec<String>,
    pub domains: Vec<String>,
    pub geo_sites: Vec<String>,
    #[serde(rename = "geoIPs")]
    pub geo_ips: Vec<String>,
}

impl RuleSet {
    /// 全局分类的值
    pub fn values(&self, direction: Direction, rule_type: RuleType) -> &[String] {
        match (direction, rule_type) {
            (Direction::Proxy, RuleType::DomainKeyword) => &self.proxy_domain_keywords,
            (Direction::Proxy, RuleType::DomainSuffix) => &self.proxy_domains,
            (Direction::Proxy, RuleType::IpCidr) => &self.proxy_ips,
            (Direction::Proxy, RuleType::GeoSite) => &self.proxy_geo_sites,
            (Direction::Proxy, RuleType::GeoIp) => &self.proxy_geo_ips,
            (Direction::Direct, RuleType::DomainKeyword) => &self.direct_domain_keywords,
            (Direction::Direct, RuleType::DomainSuffix) => &self.direct_domains,
            (Direction::Direct, RuleType::IpCidr) => &self.direct_ips,
            (Direction::Direct, RuleType::GeoSite) => &self.direct_geo_sites,
            (Direction::Direct, RuleType::GeoIp) => &self.direct_geo_ips,
        }
    }

    pub fn values_mut(&mut self, direction: Direction, rule_type: RuleType) -> &mut Vec<String> {
        match (direction, rule_type) {
            (Direction::Proxy, RuleType::DomainKeyword) => &mut self.proxy_domain_keywords,
            (Direction::Proxy, RuleType::DomainSuffix) => &mut self.proxy_domains,
            (Direction::Proxy, RuleType::IpCidr) => &mut self.proxy_ips,
            (Direction::Proxy, RuleType::GeoSite) => &mut self.proxy_geo_sites,
            (Direction::Proxy, RuleType::GeoIp) => &mut self.proxy_geo_ips,
            (Direction::Direct, RuleType::DomainKeyword) => &mut self.direct_domain_keywords,
            (Direction::Direct, RuleType::DomainSuffix) => &mut self.direct_domains,
            (Direction::Direct, RuleType::IpCidr) => &mut self.direct_ips,
            (Direction::Direct, RuleType::GeoSite) => &mut self.direct_geo_sites,
            (Direction::Direct, RuleType::GeoIp) => &mut self.direct_geo_ips,
        }
    }

    /// 全局分类在 JSON 载荷里的字段名
    pub fn field_name(direction: Direction, rule_type: RuleType) -> &'static str {
        match (direction, rule_type) {
            (Direction::Proxy, RuleType::DomainKeyword) => "proxyDomainKeywords",
            (Direction::Proxy, RuleType::DomainSuffix) => "proxyDomains",
            (Direction::Proxy, RuleType::IpCidr) => "proxyIPs",
            (Direction::Proxy, RuleType::GeoSite) => "proxyGeoSites",
            (Direction::Proxy, RuleType::GeoIp) => "proxyGeoIPs",
            (Direction::Direct, RuleType::DomainKeyword) => "directDomainKeywords",
            (Direction::Direct, RuleType::DomainSuffix) => "directDomains",
            (Direction::Direct, RuleType::IpCidr) => "directIPs",
            (Direction::Direct, RuleType::GeoSite) => "directGeoSites",
            (Direction::Direct, RuleType::GeoIp) => "directGeoIPs",
        }
    }

    /// 按名字查找自定义代理组（第一个同名组）
    pub fn group_mut(&mut self, name: &str) -> Option<&mut Group> {
        self.proxy_groups.iter_mut().find(|g| g.name == name)
    }

    /// 示例规则集
    pub fn example() -> Self {
        Self {
            proxy_domains: strings(&["dl.tailscale.com"]),
            proxy_geo_sites: strings(&["github"]),
            proxy_geo_ips: strings(&["github"]),
            direct_domains: strings(&["bgm.tv"]),
            direct_ips: strings(&["192.168.0.0/24"]),
            direct_geo_sites: strings(&["tailscale"]),
            direct_geo_ips: strings(&["tailscale"]),
            proxy_groups: vec![
                Group {
                    geo_sites: strings(&["google"]),
                    ..Group::named("Google")
                },
                Group {
                    direct_first: true,
                    geo_sites: strings(&["microsoft"]),
                    ..Group::named("Microsoft")
                },
                Group {
                    direct_first: true,
                    geo_sites: strings(&["apple"]),
                    ..Group::named("Apple")
                },
                Group {
                    geo_sites: strings(&["spotify"]),
                    ..Group::named("Spotify")
                },
                Group {
                    filters: strings(&["US", "EU", "UnitedStates", "美国", "FR"]),
                    domains: strings(&["e-hentai.org", "exhentai.org"]),
                    ..Group::named("E-Hentai")
                },
                Group {
                    filters: strings(&["japan", "日本", "jp"]),
                    domains: strings(&["dlsite.com"]),
                    ..Group::named("DLsite")
                },
            ],
            ..Default::default()
        }
    }
}

impl Group {
    /// 创建只有名字的空组
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// 组内分类的值
    ///
    /// 自定义组没有 IP-CIDR 分类，查询 IP-CIDR 总是返回空。
    pub fn values(&self, rule_type: RuleType) -> &[String] {
        match rule_type {
            RuleType::DomainKeyword => &self.domain_keywords,
            RuleType::DomainSuffix => &self.domains,
            RuleType::GeoSite => &self.geo_sites,
            RuleType::GeoIp => &self.geo_ips,
            RuleType::IpCidr => &[],
        }
    }

    /// 组内分类在 JSON 载荷里的字段名
    pub fn field_name(rule_type: RuleType) -> Option<&'static str> {
        match rule_type {
            RuleType::DomainKeyword => Some("domainKeywords"),
            RuleType::DomainSuffix => Some("domains"),
            RuleType::GeoSite => Some("geoSites"),
            RuleType::GeoIp => Some("geoIPs"),
            RuleType::IpCidr => None,
        }
    }

    pub fn values_mut(&mut self, rule_type: RuleType) -> Option<&mut Vec<String>> {
        match rule_type {
            RuleType::DomainKeyword => Some(&mut self.domain_keywords),
            RuleType::DomainSuffix => Some(&mut self.domains),
            RuleType::GeoSite => Some(&mut self.geo_sites),
            RuleType::GeoIp => Some(&mut self.geo_ips),
            RuleType::IpCidr => None,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ========================================
// 测试模块
// ========================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_field_names() {
        let rules = RuleSet {
            proxy_ips: vec!["1.1.1.1/32".to_string()],
            proxy_groups: vec![Group {
                geo_ips: vec!["jp".to_string()],
                ..Group::named("G")
            }],
            ..Default::default()
        };
        let json = serde_json::to_value(&rules).unwrap();

        assert_eq!(json["proxyIPs"][0], "1.1.1.1/32");
        assert!(json["directGeoIPs"].as_array().unwrap().is_empty());
        assert!(json.get("proxyDomainKeywords").is_some());
        assert_eq!(json["proxyGroups"][0]["geoIPs"][0], "jp");
        assert_eq!(json["proxyGroups"][0]["directFirst"], false);
    }

    #[test]
    fn test_field_names_match_payload() {
        use crate::rule::directive::GLOBAL_CATEGORIES;
        use crate::rule::group::GROUP_RULE_TYPES;

        let mut rules = RuleSet::default();
        let mut group = Group::named("G");
        for &(direction, rule_type) in &GLOBAL_CATEGORIES {
            rules
                .values_mut(direction, rule_type)
                .push(format!("{}-{}", direction.key(), rule_type.key()));
        }
        for &rule_type in &GROUP_RULE_TYPES {
            if let Some(values) = group.values_mut(rule_type) {
                values.push(rule_type.key().to_string());
            }
        }
        rules.proxy_groups.push(group);
        let json = serde_json::to_value(&rules).unwrap();

        for &(direction, rule_type) in &GLOBAL_CATEGORIES {
            let field = RuleSet::field_name(direction, rule_type);
            assert_eq!(
                json[field][0],
                format!("{}-{}", direction.key(), rule_type.key()),
                "{}",
                field
            );
        }
        for &rule_type in &GROUP_RULE_TYPES {
            let field = Group::field_name(rule_type).unwrap();
            assert_eq!(json["proxyGroups"][0][field][0], rule_type.key(), "{}", field);
        }
        assert_eq!(Group::field_name(RuleType::IpCidr), None);
    }

    #[test]
    fn test_missing_field_rejected() {
        let json = r#"{"proxyDomains": []}"#;
        assert!(serde_json::from_str::<RuleSet>(json).is_err());
    }

    #[test]
    fn test_group_has_no_ip_cidr() {
        let mut group = Group::named("G");
        assert!(group.values(RuleType::IpCidr).is_empty());
        assert!(group.values_mut(RuleType::IpCidr).is_none());
    }

    #[test]
    fn test_example_groups() {
        let rules = RuleSet::example();
        let names: Vec<&str> = rules.proxy_groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Google", "Microsoft", "Apple", "Spotify", "E-Hentai", "DLsite"]
        );
        assert_eq!(rules.direct_ips, vec!["192.168.0.0/24"]);
    }
}
