//! # 规则集编辑
//!
//! 命令行版的规则编辑器：只修改内存中的规则集，修改后再重新编码成 token。
//!
//! ## 参数格式
//! - 全局分类: `proxy-domain-suffix=example.com`
//! - 组分类:   `Google:geosite=google`、`DLsite:filter=jp`
//! - 组开关:   `Apple=true`
//! - 组改名:   `Old=New`
//!
//! 删除、改名找不到目标时报错，不会静默成功。

use std::str::FromStr;

use anyhow::{bail, Context, Result};

use super::directive::{Direction, RuleType};
use super::{Group, RuleSet};

// ========================================
// 参数类型
// ========================================

/// 全局分类中的一个值
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalEntry {
    pub direction: Direction,
    pub rule_type: RuleType,
    pub value: String,
}

impl FromStr for GlobalEntry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (category, value) = split_value(s)?;
        let (direction, rule_type) = category
            .split_once('-')
            .ok_or_else(|| format!("expected <proxy|direct>-<type>, got '{}'", category))?;

        Ok(Self {
            direction: direction.parse()?,
            rule_type: rule_type.parse()?,
            value: value.to_string(),
        })
    }
}

/// 自定义组内可编辑的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupField {
    /// 节点名过滤词
    Filter,
    /// 组规则分类（不含 IP-CIDR）
    Rule(RuleType),
}

impl FromStr for GroupField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("filter") {
            return Ok(GroupField::Filter);
        }
        match s.parse::<RuleType>()? {
            RuleType::IpCidr => Err("proxy groups have no ip-cidr category".to_string()),
            rule_type => Ok(GroupField::Rule(rule_type)),
        }
    }
}

/// 自定义组中的一个值
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntry {
    pub group: String,
    pub field: GroupField,
    pub value: String,
}

impl FromStr for GroupEntry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (group, rest) = s
            .split_once(':')
            .ok_or_else(|| format!("expected <group>:<field>=<value>, got '{}'", s))?;
        let (field, value) = split_value(rest)?;

        Ok(Self {
            group: group.to_string(),
            field: field.parse()?,
            value: value.to_string(),
        })
    }
}

/// 自定义组的 direct-first 开关
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupFlag {
    pub group: String,
    pub enabled: bool,
}

impl FromStr for GroupFlag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (group, value) = split_value(s)?;
        let enabled = value
            .parse()
            .map_err(|_| format!("expected true or false, got '{}'", value))?;

        Ok(Self {
            group: group.to_string(),
            enabled,
        })
    }
}

/// 自定义组改名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRename {
    pub from: String,
    pub to: String,
}

impl FromStr for GroupRename {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (from, to) = split_value(s)?;
        if to.is_empty() {
            return Err("new group name must not be empty".to_string());
        }

        Ok(Self {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

fn split_value(s: &str) -> Result<(&str, &str), String> {
    s.split_once('=')
        .ok_or_else(|| format!("expected <key>=<value>, got '{}'", s))
}

// ========================================
// 编辑操作
// ========================================

/// 单个编辑操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Add(GlobalEntry),
    Remove(GlobalEntry),
    AddGroup(String),
    RemoveGroup(String),
    RenameGroup(GroupRename),
    SetDirectFirst(GroupFlag),
    GroupAdd(GroupEntry),
    GroupRemove(GroupEntry),
}

impl RuleSet {
    /// 依次应用编辑操作；任一操作失败则整体失败，规则集保持原样
    pub fn apply_all(&mut self, edits: &[Edit]) -> Result<()> {
        let mut draft = self.clone();
        for edit in edits {
            draft
                .apply(edit)
                .with_context(|| format!("failed to apply {:?}", edit))?;
        }
        *self = draft;
        Ok(())
    }

    /// 应用单个编辑操作
    ///
    /// 添加不去重；删除会移除所有相同的值，一个都没有时报错。
    /// 改名作用于所有同名的组。
    pub fn apply(&mut self, edit: &Edit) -> Result<()> {
        match edit {
            Edit::Add(entry) => {
                self.values_mut(entry.direction, entry.rule_type)
                    .push(entry.value.clone());
            }
            Edit::Remove(entry) => {
                let values = self.values_mut(entry.direction, entry.rule_type);
                if !remove_value(values, &entry.value) {
                    bail!(
                        "no '{}' in {}-{}",
                        entry.value,
                        entry.direction.key(),
                        entry.rule_type.key()
                    );
                }
            }
            Edit::AddGroup(name) => {
                if name.is_empty() {
                    bail!("group name must not be empty");
                }
                self.proxy_groups.push(Group::named(name.as_str()));
            }
            Edit::RemoveGroup(name) => {
                let before = self.proxy_groups.len();
                self.proxy_groups.retain(|g| &g.name != name);
                if self.proxy_groups.len() == before {
                    bail!("no proxy group named '{}'", name);
                }
            }
            Edit::RenameGroup(rename) => {
                if rename.to.is_empty() {
                    bail!("group name must not be empty");
                }
                let mut renamed = 0;
                for group in self.proxy_groups.iter_mut().filter(|g| g.name == rename.from) {
                    group.name = rename.to.clone();
                    renamed += 1;
                }
                if renamed == 0 {
                    bail!("no proxy group named '{}'", rename.from);
                }
            }
            Edit::SetDirectFirst(flag) => {
                self.existing_group(&flag.group)?.direct_first = flag.enabled;
            }
            Edit::GroupAdd(entry) => {
                field_values(self.existing_group(&entry.group)?, entry.field)?
                    .push(entry.value.clone());
            }
            Edit::GroupRemove(entry) => {
                let values = field_values(self.existing_group(&entry.group)?, entry.field)?;
                if !remove_value(values, &entry.value) {
                    bail!("no '{}' in group '{}'", entry.value, entry.group);
                }
            }
        }
        Ok(())
    }

    fn existing_group(&mut self, name: &str) -> Result<&mut Group> {
        self.group_mut(name)
            .with_context(|| format!("no proxy group named '{}'", name))
    }
}

/// 移除所有相同的值，返回是否移除了任何一个
fn remove_value(values: &mut Vec<String>, value: &str) -> bool {
    let before = values.len();
    values.retain(|v| v != value);
    values.len() != before
}

fn field_values(group: &mut Group, field: GroupField) -> Result<&mut Vec<String>> {
    match field {
        GroupField::Filter => Ok(&mut group.filters),
        GroupField::Rule(rule_type) => group
            .values_mut(rule_type)
            .with_context(|| format!("proxy groups have no {} category", rule_type.key())),
    }
}
