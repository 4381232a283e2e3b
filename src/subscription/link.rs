//! # 订阅转换链接
//!
//! 链接格式：`<base>?rules=<TOKEN>&sub=<百分号编码的订阅地址>`。
//! 客户端直接订阅该链接，服务端按查询参数取出规则集和订阅地址。

use anyhow::{Context, Result};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

/// 与 JavaScript `encodeURIComponent` 一致的保留字符集
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// 从链接中取出的参数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkParams {
    /// 规则集 token
    pub rules: Option<String>,
    /// 订阅地址（仍需经过 `resolve_source_url`）
    pub sub: Option<String>,
}

/// 生成订阅转换链接
pub fn build_link(base: &str, token: &str, sub: &str) -> Result<String> {
    let mut url = Url::parse(base).with_context(|| format!("Invalid base url: {}", base))?;

    let query = format!(
        "rules={}&sub={}",
        utf8_percent_encode(token, COMPONENT),
        utf8_percent_encode(sub, COMPONENT)
    );
    url.set_query(Some(&query));

    Ok(url.into())
}

/// 解析订阅转换链接的查询参数；同名参数取第一个，空值视为缺失
pub fn parse_link(link: &str) -> Result<LinkParams> {
    let url = Url::parse(link).with_context(|| format!("Invalid link: {}", link))?;

    let mut params = LinkParams::default();
    for (key, value) in url.query_pairs() {
        let slot = match key.as_ref() {
            "rules" => &mut params.rules,
            "sub" => &mut params.sub,
            _ => continue,
        };
        if slot.is_none() && !value.is_empty() {
            *slot = Some(value.into_owned());
        }
    }
    Ok(params)
}
