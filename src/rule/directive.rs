//! # 分流规则生成
//!
//! 定义单条分流规则（directive）及其文本格式，
//! 并把规则集里的全局分类展开成规则列表。
//!
//! ## 文本格式
//! - `TYPE,VALUE,TARGET`
//! - `TYPE,VALUE,TARGET,no-resolve`（仅直连 IP-CIDR）

use std::fmt;
use std::str::FromStr;

use super::RuleSet;

/// 直连目标
pub const DIRECT: &str = "DIRECT";

/// 直连 IP 规则附加的标记：匹配时不做 DNS 解析
pub const NO_RESOLVE: &str = "no-resolve";

// ========================================
// 规则类型 & 方向
// ========================================

/// 规则类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleType {
    /// 域名关键词
    DomainKeyword,
    /// 域名后缀
    DomainSuffix,
    /// IP-CIDR
    IpCidr,
    /// GEOSITE 分类
    GeoSite,
    /// GEOIP 分类
    GeoIp,
}

impl RuleType {
    /// 命令行里使用的分类名
    pub fn key(self) -> &'static str {
        match self {
            RuleType::DomainKeyword => "domain-keyword",
            RuleType::DomainSuffix => "domain-suffix",
            RuleType::IpCidr => "ip-cidr",
            RuleType::GeoSite => "geosite",
            RuleType::GeoIp => "geoip",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleType::DomainKeyword => write!(f, "DOMAIN-KEYWORD"),
            RuleType::DomainSuffix => write!(f, "DOMAIN-SUFFIX"),
            RuleType::IpCidr => write!(f, "IP-CIDR"),
            RuleType::GeoSite => write!(f, "GEOSITE"),
            RuleType::GeoIp => write!(f, "GEOIP"),
        }
    }
}

impl FromStr for RuleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "domain-keyword" => Ok(RuleType::DomainKeyword),
            "domain-suffix" => Ok(RuleType::DomainSuffix),
            "ip-cidr" => Ok(RuleType::IpCidr),
            "geosite" => Ok(RuleType::GeoSite),
            "geoip" => Ok(RuleType::GeoIp),
            other => Err(format!("unknown rule type '{}'", other)),
        }
    }
}

/// 全局规则的方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// 走默认代理组
    Proxy,
    /// 直连
    Direct,
}

impl Direction {
    /// 命令行和扩展脚本里使用的方向名
    pub fn key(self) -> &'static str {
        match self {
            Direction::Proxy => "proxy",
            Direction::Direct => "direct",
        }
    }

    /// 解析出规则目标：代理方向指向默认代理组
    pub fn target(self, default_group: &str) -> Target {
        match self {
            Direction::Proxy => Target::Group(default_group.to_string()),
            Direction::Direct => Target::Direct,
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "proxy" => Ok(Direction::Proxy),
            "direct" => Ok(Direction::Direct),
            other => Err(format!("unknown direction '{}'", other)),
        }
    }
}

/// 规则目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// 直连
    Direct,
    /// 代理组（默认组或用户自定义组）
    Group(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Direct => f.write_str(DIRECT),
            Target::Group(name) => f.write_str(name),
        }
    }
}

// ========================================
// 单条规则
// ========================================

/// 单条分流规则
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// 规则类型
    pub rule_type: RuleType,
    /// 规则值（域名、关键词、CIDR 或分类名）
    pub value: String,
    /// 目标
    pub target: Target,
    /// 是否附加 no-resolve
    pub no_resolve: bool,
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.rule_type, self.value, self.target)?;
        if self.no_resolve {
            write!(f, ",{}", NO_RESOLVE)?;
        }
        Ok(())
    }
}

// ========================================
// 全局分类表
// ========================================

/// 全局分类，按生成顺序排列：先代理后直连，每个方向内
/// 依次为关键词、后缀、IP-CIDR、GEOSITE、GEOIP
pub const GLOBAL_CATEGORIES: [(Direction, RuleType); 10] = [
    (Direction::Proxy, RuleType::DomainKeyword),
    (Direction::Proxy, RuleType::DomainSuffix),
    (Direction::Proxy, RuleType::IpCidr),
    (Direction::Proxy, RuleType::GeoSite),
    (Direction::Proxy, RuleType::GeoIp),
    (Direction::Direct, RuleType::DomainKeyword),
    (Direction::Direct, RuleType::DomainSuffix),
    (Direction::Direct, RuleType::IpCidr),
    (Direction::Direct, RuleType::GeoSite),
    (Direction::Direct, RuleType::GeoIp),
];

/// 只有直连 IP-CIDR 规则附加 no-resolve
pub fn needs_no_resolve(direction: Direction, rule_type: RuleType) -> bool {
    direction == Direction::Direct && rule_type == RuleType::IpCidr
}

/// 把一个分类的值展开为规则，保持输入顺序
pub fn generate(
    direction: Direction,
    rule_type: RuleType,
    values: &[String],
    default_group: &str,
) -> Vec<Directive> {
    let no_resolve = needs_no_resolve(direction, rule_type);

    values
        .iter()
        .map(|value| Directive {
            rule_type,
            value: value.clone(),
            target: direction.target(default_group),
            no_resolve,
        })
        .collect()
}

/// 展开规则集的全部十个全局分类
pub fn global_directives(rules: &RuleSet, default_group: &str) -> Vec<Directive> {
    GLOBAL_CATEGORIES
        .iter()
        .flat_map(|&(direction, rule_type)| {
            generate(
                direction,
                rule_type,
                rules.values(direction, rule_type),
                default_group,
            )
        })
        .collect()
}

// ========================================
// 测试模块
// ========================================
#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn render(directives: &[Directive]) -> Vec<String> {
        directives.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_generate_proxy() {
        let values = strings(&["example.com", "example.org"]);
        let out = generate(Direction::Proxy, RuleType::DomainSuffix, &values, "Proxy");
        assert_eq!(
            render(&out),
            vec![
                "DOMAIN-SUFFIX,example.com,Proxy",
                "DOMAIN-SUFFIX,example.org,Proxy"
            ]
        );
    }

    #[test]
    fn test_generate_direct_ip_no_resolve() {
        let values = strings(&["192.168.0.0/24"]);
        let out = generate(Direction::Direct, RuleType::IpCidr, &values, "Proxy");
        assert_eq!(render(&out), vec!["IP-CIDR,192.168.0.0/24,DIRECT,no-resolve"]);

        // 代理方向的 IP 规则不带标记
        let out = generate(Direction::Proxy, RuleType::IpCidr, &values, "Proxy");
        assert_eq!(render(&out), vec!["IP-CIDR,192.168.0.0/24,Proxy"]);
    }

    #[test]
    fn test_generate_empty() {
        assert!(generate(Direction::Direct, RuleType::GeoIp, &[], "Proxy").is_empty());
    }

    #[test]
    fn test_global_order() {
        let rules = RuleSet {
            direct_geo_ips: strings(&["cn"]),
            proxy_domain_keywords: strings(&["google"]),
            direct_ips: strings(&["10.0.0.0/8"]),
            proxy_geo_sites: strings(&["github"]),
            ..Default::default()
        };

        let out = global_directives(&rules, "Default");
        assert_eq!(
            render(&out),
            vec![
                "DOMAIN-KEYWORD,google,Default",
                "GEOSITE,github,Default",
                "IP-CIDR,10.0.0.0/8,DIRECT,no-resolve",
                "GEOIP,cn,DIRECT",
            ]
        );
    }

    #[test]
    fn test_parse_keys() {
        assert_eq!("geoip".parse::<RuleType>(), Ok(RuleType::GeoIp));
        assert_eq!("IP-CIDR".parse::<RuleType>(), Ok(RuleType::IpCidr));
        assert!("process-name".parse::<RuleType>().is_err());
        assert_eq!("Direct".parse::<Direction>(), Ok(Direction::Direct));
    }
}
