//! # 错误类型
//!
//! 核心流程（解码 → 拉取 → 解析 → 合并）的失败种类。
//! 每种失败都只影响当前这一次调用，不会产生部分输出。

use thiserror::Error;

/// 核心流程错误
#[derive(Debug, Error)]
pub enum Error {
    /// 缺少规则 token 或订阅地址（用户可修正）
    #[error("missing {0}")]
    MissingInput(&'static str),

    /// 规则 token 存在但无法解码
    #[error("rule-set token is malformed")]
    Decode,

    /// 订阅拉取失败：网络不可达或上游返回非 2xx
    #[error("failed to fetch subscription: {}", upstream(.status, .message))]
    Fetch {
        /// 上游 HTTP 状态码（传输层错误时为 None）
        status: Option<u16>,
        /// 上游状态描述或传输层错误信息
        message: String,
    },

    /// 订阅内容不是合法的 YAML 配置文档
    #[error("subscription is not a valid config document: {0}")]
    Document(String),

    /// 订阅配置没有任何 proxy-groups，找不到默认代理组
    #[error("subscription config has no proxy-groups, no default group to target")]
    ConfigInvariant,
}

impl Error {
    /// 进程退出码
    ///
    /// - 2: 输入错误（缺参数 / token 损坏）
    /// - 3: 上游错误（拉取失败 / 文档损坏）
    /// - 4: 配置不变量被破坏
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::MissingInput(_) | Error::Decode => 2,
            Error::Fetch { .. } | Error::Document(_) => 3,
            Error::ConfigInvariant => 4,
        }
    }
}

/// 上游失败描述：有状态码时形如 `HTTP 503 Service Unavailable`
fn upstream(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("HTTP {} {}", code, message),
        None => message.to_string(),
    }
}

// ========================================
// 测试模块
// ========================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invariant_is_distinct_from_decode() {
        assert_ne!(Error::ConfigInvariant.exit_code(), Error::Decode.exit_code());
        assert_eq!(Error::MissingInput("rules").exit_code(), Error::Decode.exit_code());
    }

    #[test]
    fn test_fetch_message() {
        let err = Error::Fetch {
            status: Some(404),
            message: "Not Found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to fetch subscription: HTTP 404 Not Found"
        );
        assert_eq!(err.exit_code(), 3);

        // 传输层错误没有状态码
        let err = Error::Fetch {
            status: None,
            message: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to fetch subscription: connection refused"
        );
    }
}
