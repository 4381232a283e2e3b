//! # 订阅拉取
//!
//! 单次拉取，不重试。上游的响应头原样带回给调用方。

use percent_encoding::percent_decode_str;
use reqwest::blocking::Client;
use reqwest::header::HeaderMap;
use tracing::debug;

use crate::error::Error;

/// 默认 User-Agent：部分机场只对 Clash 系客户端返回完整 YAML
pub const DEFAULT_USER_AGENT: &str = "clash-verge/v2.4.2";

/// 请求带元数据输出的查询后缀
const META_FLAG: &str = "&flag=meta";

/// 拉取结果
#[derive(Debug)]
pub struct FetchedSubscription {
    /// 响应正文
    pub body: String,
    /// 上游响应头（流量信息、更新间隔等）
    pub headers: HeaderMap,
}

/// 解析订阅地址
///
/// 先做百分号解码；已带查询串且不以 `&flag=meta` 结尾时追加该后缀，
/// 没有查询串的地址原样使用。
pub fn resolve_source_url(raw: &str) -> Result<String, Error> {
    let url = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|e| Error::Fetch {
            status: None,
            message: format!("subscription url is not valid utf-8: {}", e),
        })?
        .into_owned();

    if url.contains('?') && !url.ends_with(META_FLAG) {
        Ok(format!("{}{}", url, META_FLAG))
    } else {
        Ok(url)
    }
}

/// 拉取订阅
pub fn fetch(url: &str, user_agent: &str) -> Result<FetchedSubscription, Error> {
    let transport = |e: reqwest::Error| Error::Fetch {
        status: None,
        message: e.to_string(),
    };

    let client = Client::builder()
        .user_agent(user_agent)
        .build()
        .map_err(transport)?;

    let response = client.get(url).send().map_err(transport)?;
    let status = response.status();
    debug!(status = %status, "subscription responded");

    if !status.is_success() {
        return Err(Error::Fetch {
            status: Some(status.as_u16()),
            message: status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string(),
        });
    }

    let headers = response.headers().clone();
    let body = response.text().map_err(transport)?;

    Ok(FetchedSubscription { body, headers })
}

// ========================================
// 测试模块
// ========================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_meta_flag() {
        assert_eq!(
            resolve_source_url("https://sub.example.com/api?token=abc").unwrap(),
            "https://sub.example.com/api?token=abc&flag=meta"
        );
    }

    #[test]
    fn test_keeps_existing_meta_flag() {
        let url = "https://sub.example.com/api?token=abc&flag=meta";
        assert_eq!(resolve_source_url(url).unwrap(), url);
    }

    #[test]
    fn test_without_query() {
        let url = "https://sub.example.com/clash.yaml";
        assert_eq!(resolve_source_url(url).unwrap(), url);
    }

    #[test]
    fn test_percent_decoded_first() {
        assert_eq!(
            resolve_source_url("https%3A%2F%2Fsub.example.com%2Fapi%3Ftoken%3Dabc").unwrap(),
            "https://sub.example.com/api?token=abc&flag=meta"
        );
    }

    #[test]
    fn test_invalid_utf8() {
        assert!(matches!(
            resolve_source_url("https://a.com/%FF"),
            Err(Error::Fetch { status: None, .. })
        ));
    }
}
