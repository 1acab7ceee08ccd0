// 掩码语言模型打分接口
//
// 补全器只依赖该 trait，具体模型（远程 HTTP 服务 / 测试桩）由调用方注入

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::language::Language;

// ============================================================================
// 请求 / 响应
// ============================================================================

/// 打分请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRequest {
    /// 含且仅含一个 `[MASK]` 的上下文
    pub context: String,
    /// 掩码在 `context` 中的字符偏移
    pub mask_position: usize,
    pub language: Language,
    pub top_k: usize,
}

/// 单个候选
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredToken {
    pub token: String,
    pub score: f32,
}

impl ScoredToken {
    pub fn new(token: impl Into<String>, score: f32) -> Self {
        Self {
            token: token.into(),
            score,
        }
    }
}

/// 打分响应
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub candidates: Vec<ScoredToken>,
}

// ============================================================================
// 失败原因
// ============================================================================

/// 单个片段未补全的原因
///
/// 均为可恢复失败：片段保持 `[---]`，记录继续流转
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum InfillFailure {
    /// 该语言未配置打分服务，或补全被关闭
    NoScorer,
    /// 调用超时
    Timeout,
    /// 服务返回错误
    Scorer(String),
    /// 无可用候选
    NoCandidate,
    /// 上下文中掩码数量不为 1
    MalformedContext,
}

impl std::fmt::Display for InfillFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InfillFailure::NoScorer => f.write_str("no scorer"),
            InfillFailure::Timeout => f.write_str("timeout"),
            InfillFailure::Scorer(msg) => write!(f, "scorer error: {}", msg),
            InfillFailure::NoCandidate => f.write_str("no candidate"),
            InfillFailure::MalformedContext => f.write_str("malformed context"),
        }
    }
}

// ============================================================================
// 打分器 trait
// ============================================================================

/// 掩码语言模型打分服务
///
/// 实现必须可在多个任务间共享；调用方负责超时与并发限制
#[async_trait]
pub trait MaskScorer: Send + Sync {
    async fn score(&self, request: ScoreRequest) -> Result<ScoreResponse>;

    /// 用于日志
    fn name(&self) -> &str {
        "mask-scorer"
    }
}
