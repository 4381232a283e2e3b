//! # 订阅模块
//!
//! 订阅配置文档的结构与 YAML 编解码、订阅拉取、订阅转换链接。

mod document;
pub mod fetch;
pub mod link;

// 重新导出常用类型
pub use document::{parse_document, to_document, ProxyGroup, SubscriptionConfig};
