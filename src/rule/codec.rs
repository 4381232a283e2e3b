//! # 规则集编解码
//!
//! 规则集 → JSON → base64 token，用于放进订阅转换链接的 `rules` 参数。
//!
//! 编码使用 URL 安全字母表且不带填充；解码同时接受标准字母表、
//! 带 / 不带 `=` 填充，以及查询串解码时被还原成空格的 `+`。

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use tracing::warn;

use super::RuleSet;

/// 编码规则集；失败时返回 None
pub fn encode(rules: &RuleSet) -> Option<String> {
    match serde_json::to_string(rules) {
        Ok(json) => Some(URL_SAFE_NO_PAD.encode(json)),
        Err(e) => {
            warn!(error = %e, "failed to encode rule-set");
            None
        }
    }
}

/// 解码 token
///
/// - 缺失或为空：返回 None（“未提供规则集”）
/// - 编码或结构损坏：返回 None
pub fn decode(token: Option<&str>) -> Option<RuleSet> {
    let token = token.filter(|t| !t.is_empty())?;

    let bytes = match decode_base64(token) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "rule-set token is not valid base64");
            return None;
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(rules) => Some(rules),
        Err(e) => {
            warn!(error = %e, "rule-set token does not contain a valid rule-set");
            None
        }
    }
}

/// 统一成标准字母表、去掉填充后再解码
fn decode_base64(token: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let normalized: String = token
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '-' | ' ' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    STANDARD_NO_PAD.decode(normalized)
}
