//! # 扩展脚本导出
//!
//! 生成 Clash Verge Rev 的扩展脚本（`function main(config)`），
//! 让客户端在本地完成合并，不经过转换服务。
//!
//! 脚本头部嵌入规则集和生成规则用的各张表，表的内容直接来自
//! `GLOBAL_CATEGORIES`、`GROUP_RULE_TYPES` 和 `PLACEMENTS`，
//! 脚本主体只按表解释，因此和 `merge` 的结果保持一致。

use std::fmt::Write as _;

use serde_json::{json, Value};

use super::directive::{needs_no_resolve, Direction, DIRECT, GLOBAL_CATEGORIES, NO_RESOLVE};
use super::group::{Slot, GROUP_RULE_TYPES, PLACEMENTS};
use super::{Group, RuleSet};

/// 脚本主体：只读取头部的常量
const SCRIPT_BODY: &str = r#"
function main(config) {
  const groups = config['proxy-groups'] || [];
  if (groups.length === 0) {
    throw new Error('subscription config has no proxy-groups, no default group to target');
  }
  const [defaultGroup, ...otherGroups] = groups;

  const render = (type, value, target, noResolve) =>
    noResolve ? `${type},${value},${target},${NO_RESOLVE}` : `${type},${value},${target}`;
  const targetOf = (direction) =>
    direction === DIRECTIONS.direct ? DIRECT : defaultGroup.name;

  const globalRules = GLOBAL_CATEGORIES.flatMap((c) =>
    RULE_SET[c.field].map((v) => render(c.type, v, targetOf(c.direction), c.noResolve)));
  const groupRules = RULE_SET.proxyGroups.flatMap((g) =>
    GROUP_CATEGORIES.flatMap((c) => g[c.field].map((v) => render(c.type, v, g.name, false))));

  const proxyNames = (config.proxies || []).map((p) => p.name);
  const applies = (g, when) => {
    if (when === null) return true;
    const value = g[when];
    return Array.isArray(value) ? value.length > 0 : value === true;
  };
  const newGroups = RULE_SET.proxyGroups.map((g) => {
    const filters = g.filters.map((f) => f.toLowerCase());
    const filtered = proxyNames.filter((name) =>
      filters.length === 0 || filters.some((f) => name.toLowerCase().includes(f)));
    const placement = PLACEMENTS.find((p) => applies(g, p.when));
    const proxies = placement.slots.flatMap((slot) => {
      if (slot === SLOTS.direct) return [DIRECT];
      if (slot === SLOTS.defaultGroup) return [defaultGroup.name];
      return filtered;
    });
    return { name: g.name, type: 'select', proxies };
  });

  return {
    ...config,
    'proxy-groups': [defaultGroup, ...newGroups, ...otherGroups],
    rules: [...globalRules, ...groupRules, ...(config.rules || [])],
  };
}
"#;

/// 生成扩展脚本
pub fn render_script(rules: &RuleSet) -> serde_json::Result<String> {
    let constants = [
        ("RULE_SET", serde_json::to_value(rules)?),
        ("GLOBAL_CATEGORIES", global_categories()),
        ("GROUP_CATEGORIES", group_categories()),
        ("PLACEMENTS", placements()),
        (
            "DIRECTIONS",
            json!({
                "proxy": Direction::Proxy.key(),
                "direct": Direction::Direct.key(),
            }),
        ),
        (
            "SLOTS",
            json!({
                "direct": Slot::Direct.key(),
                "defaultGroup": Slot::DefaultGroup.key(),
                "proxies": Slot::Proxies.key(),
            }),
        ),
        ("DIRECT", json!(DIRECT)),
        ("NO_RESOLVE", json!(NO_RESOLVE)),
    ];

    let mut script = format!(
        "// Generated by sub-rules {} for Clash Verge Rev.\n",
        env!("CARGO_PKG_VERSION")
    );
    for (name, value) in &constants {
        // 写入 String 不会失败
        let _ = writeln!(
            script,
            "const {} = {};",
            name,
            serde_json::to_string_pretty(value)?
        );
    }
    script.push_str(SCRIPT_BODY);
    Ok(script)
}

fn global_categories() -> Value {
    GLOBAL_CATEGORIES
        .iter()
        .map(|&(direction, rule_type)| {
            json!({
                "field": RuleSet::field_name(direction, rule_type),
                "type": rule_type.to_string(),
                "direction": direction.key(),
                "noResolve": needs_no_resolve(direction, rule_type),
            })
        })
        .collect()
}

fn group_categories() -> Value {
    GROUP_RULE_TYPES
        .iter()
        .filter_map(|&rule_type| {
            Group::field_name(rule_type).map(|field| {
                json!({
                    "field": field,
                    "type": rule_type.to_string(),
                })
            })
        })
        .collect()
}

fn placements() -> Value {
    PLACEMENTS
        .iter()
        .map(|placement| {
            json!({
                "when": placement.field(),
                "slots": placement.slots().map(Slot::key),
            })
        })
        .collect()
}
