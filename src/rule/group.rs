//! # 自定义代理组
//!
//! 1. 把每个自定义组的分类展开为指向该组的规则
//! 2. 计算每个自定义组的成员列表（过滤后的节点 + 默认组 + DIRECT）

use super::directive::{Directive, RuleType, Target, DIRECT};
use super::Group;
use crate::subscription::ProxyGroup;

/// 组内分类的生成顺序；自定义组没有 IP-CIDR
pub const GROUP_RULE_TYPES: [RuleType; 4] = [
    RuleType::DomainKeyword,
    RuleType::DomainSuffix,
    RuleType::GeoSite,
    RuleType::GeoIp,
];

// ========================================
// 组规则
// ========================================

/// 展开所有自定义组的规则：组间按组顺序，组内按 `GROUP_RULE_TYPES`
pub fn group_directives(groups: &[Group]) -> Vec<Directive> {
    groups.iter().flat_map(directives_for).collect()
}

fn directives_for(group: &Group) -> Vec<Directive> {
    GROUP_RULE_TYPES
        .iter()
        .flat_map(|&rule_type| {
            group.values(rule_type).iter().map(move |value| Directive {
                rule_type,
                value: value.clone(),
                target: Target::Group(group.name.clone()),
                no_resolve: false,
            })
        })
        .collect()
}

// ========================================
// 组成员
// ========================================

/// 节点名是否命中任一过滤词（不区分大小写的子串匹配）
fn matches_any(proxy: &str, filters: &[String]) -> bool {
    let proxy = proxy.to_lowercase();
    filters
        .iter()
        .any(|filter| proxy.contains(&filter.to_lowercase()))
}

/// 成员列表中的一段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// `DIRECT`
    Direct,
    /// 订阅的默认代理组
    DefaultGroup,
    /// 过滤后的节点
    Proxies,
}

impl Slot {
    pub fn key(self) -> &'static str {
        match self {
            Slot::Direct => "direct",
            Slot::DefaultGroup => "default",
            Slot::Proxies => "proxies",
        }
    }
}

/// 成员排列策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    DirectFirst,
    Filtered,
    Default,
}

/// 排列策略，按优先级排列；最后一项总是适用
pub const PLACEMENTS: [Placement; 3] = [
    Placement::DirectFirst,
    Placement::Filtered,
    Placement::Default,
];

impl Placement {
    /// 自定义组适用的排列策略
    pub fn of(group: &Group) -> Placement {
        PLACEMENTS
            .into_iter()
            .find(|placement| placement.applies(group))
            .unwrap_or(Placement::Default)
    }

    pub fn applies(self, group: &Group) -> bool {
        match self {
            Placement::DirectFirst => group.direct_first,
            Placement::Filtered => !group.filters.is_empty(),
            Placement::Default => true,
        }
    }

    pub fn slots(self) -> [Slot; 3] {
        match self {
            Placement::DirectFirst => [Slot::Direct, Slot::DefaultGroup, Slot::Proxies],
            Placement::Filtered => [Slot::Proxies, Slot::DefaultGroup, Slot::Direct],
            Placement::Default => [Slot::DefaultGroup, Slot::Direct, Slot::Proxies],
        }
    }

    /// 扩展脚本里判断策略时读取的组字段；None 表示总是适用
    pub fn field(self) -> Option<&'static str> {
        match self {
            Placement::DirectFirst => Some("directFirst"),
            Placement::Filtered => Some("filters"),
            Placement::Default => None,
        }
    }
}

/// 计算成员列表
///
/// ## 排列策略（按优先级）
/// 1. `direct_first`: `DIRECT, 默认组, 节点...`
/// 2. 有过滤词: `节点..., 默认组, DIRECT`
/// 3. 其他: `默认组, DIRECT, 节点...`
pub fn group_members(group: &Group, proxies: &[&str], default_group: &str) -> Vec<String> {
    let filtered: Vec<String> = proxies
        .iter()
        .filter(|proxy| group.filters.is_empty() || matches_any(proxy, &group.filters))
        .map(|proxy| proxy.to_string())
        .collect();

    let mut members = Vec::with_capacity(filtered.len() + 2);
    for slot in Placement::of(group).slots() {
        match slot {
            Slot::Direct => members.push(DIRECT.to_string()),
            Slot::DefaultGroup => members.push(default_group.to_string()),
            Slot::Proxies => members.extend(filtered.iter().cloned()),
        }
    }
    members
}

/// 生成 `select` 类型的代理组
pub fn selection_group(group: &Group, proxies: &[&str], default_group: &str) -> ProxyGroup {
    ProxyGroup::select(&group.name, group_members(group, proxies, default_group))
}
