//! # 规则集模块
//!
//! 此模块负责：
//! 1. 规则集的数据结构与示例预设
//! 2. 规则集与 URL token 之间的编解码
//! 3. 把全局分类和自定义组展开为分流规则与代理组
//! 4. 命令行编辑操作

pub mod codec;
pub mod directive;
pub mod edit;
pub mod group;
pub mod script;
mod model;

pub use model::{Group, RuleSet};
