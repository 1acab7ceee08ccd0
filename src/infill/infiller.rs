// 缺失片段补全（规则 14 的执行者）
//
// 每次调用处理一个掩码：选择打分服务 → 截取上下文窗口 → 限流 + 超时调用 → 选出最佳候选

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::config::InfillConfig;
use crate::infill::http_scorer::HttpMaskScorer;
use crate::infill::scorer::{InfillFailure, MaskScorer, ScoreRequest, ScoredToken};
use crate::language::Language;
use crate::normalize::alphabet::AllowList;
use crate::normalize::sentinel::MASK;

/// 词表中的特殊符号，不能作为补全结果
const SPECIAL_TOKENS: &[&str] = &["[UNK]", "[CLS]", "[SEP]", "[PAD]", "<unk>", "<s>", "</s>", "<pad>"];

/// 选中的补全结果
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub token: String,
    /// 分数在 0..1 内时视为置信度
    pub confidence: Option<f32>,
}

/// 补全器（只读，可跨任务共享）
pub struct SpanInfiller {
    latin: Option<Arc<dyn MaskScorer>>,
    greek: Option<Arc<dyn MaskScorer>>,
    permits: Arc<Semaphore>,
    call_timeout: Duration,
    context_chars: usize,
    top_k: usize,
}

impl SpanInfiller {
    /// 不含任何打分服务的补全器，通过 `with_scorer` 注入
    pub fn new(config: &InfillConfig) -> Self {
        Self {
            latin: None,
            greek: None,
            permits: Arc::new(Semaphore::new(config.max_in_flight.max(1))),
            call_timeout: Duration::from_millis(config.timeout_ms),
            context_chars: config.context_chars,
            top_k: config.top_k,
        }
    }

    /// 按配置创建 HTTP 打分服务
    pub fn from_config(config: &InfillConfig) -> Self {
        let mut infiller = Self::new(config);
        if !config.enabled {
            tracing::info!("补全已关闭，所有缺失片段保持 [---]");
            return infiller;
        }

        if let Some(endpoint) = &config.latin {
            tracing::info!("拉丁文打分服务: {}", endpoint.endpoint);
            infiller = infiller.with_scorer(
                Language::Latin,
                Arc::new(HttpMaskScorer::new("latin", endpoint.clone())),
            );
        }
        if let Some(endpoint) = &config.greek {
            tracing::info!("希腊文打分服务: {}", endpoint.endpoint);
            infiller = infiller.with_scorer(
                Language::Greek,
                Arc::new(HttpMaskScorer::new("greek", endpoint.clone())),
            );
        }
        if infiller.latin.is_none() && infiller.greek.is_none() {
            tracing::warn!("未配置任何打分服务，缺失片段将保持未补全");
        }
        infiller
    }

    /// 注入某个语言的打分服务（Mixed/Unknown 无独立服务，调用被忽略）
    pub fn with_scorer(mut self, language: Language, scorer: Arc<dyn MaskScorer>) -> Self {
        match language {
            Language::Latin => self.latin = Some(scorer),
            Language::Greek => self.greek = Some(scorer),
            other => tracing::warn!("语言 {} 不支持独立打分服务，已忽略", other),
        }
        self
    }

    pub fn has_scorer(&self, language: Language) -> bool {
        match language {
            Language::Latin => self.latin.is_some(),
            Language::Greek => self.greek.is_some(),
            Language::Mixed => self.latin.is_some() || self.greek.is_some(),
            Language::Unknown => false,
        }
    }

    /// Mixed 记录按掩码附近的文字选择服务
    fn scorer_for(&self, language: Language, context: &str) -> Option<(Language, &Arc<dyn MaskScorer>)> {
        let resolved = match language {
            Language::Mixed => match Language::dominant_script(&context.replace(MASK, " ")) {
                Language::Greek => Language::Greek,
                _ => Language::Latin,
            },
            other => other,
        };

        match resolved {
            Language::Latin => self.latin.as_ref().map(|s| (Language::Latin, s)),
            Language::Greek => self.greek.as_ref().map(|s| (Language::Greek, s)),
            _ => None,
        }
    }

    /// 补全一个掩码
    ///
    /// # Arguments
    /// * `context` - 含且仅含一个 `[MASK]` 的文本
    /// * `language` - 记录语言；Unknown 直接返回 `NoScorer`
    /// * `allow` - 记录的字符白名单，候选须至少保留一个白名单内的字母
    pub async fn infill(
        &self,
        context: &str,
        language: Language,
        allow: &AllowList,
    ) -> Result<Candidate, InfillFailure> {
        if context.matches(MASK).count() != 1 {
            return Err(InfillFailure::MalformedContext);
        }

        let (language, scorer) = self
            .scorer_for(language, context)
            .ok_or(InfillFailure::NoScorer)?;

        let (window, mask_position) = window_around_mask(context, self.context_chars)
            .ok_or(InfillFailure::MalformedContext)?;

        let request = ScoreRequest {
            context: window,
            mask_position,
            language,
            top_k: self.top_k,
        };

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| InfillFailure::Scorer(e.to_string()))?;

        let response = match timeout(self.call_timeout, scorer.score(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::warn!("打分服务 {} 调用失败: {}", scorer.name(), e);
                return Err(InfillFailure::Scorer(e.to_string()));
            }
            Err(_) => {
                tracing::warn!(
                    "打分服务 {} 超时 ({}ms)",
                    scorer.name(),
                    self.call_timeout.as_millis()
                );
                return Err(InfillFailure::Timeout);
            }
        };

        select_candidate(&response.candidates, allow).ok_or(InfillFailure::NoCandidate)
    }
}

/// 截取掩码两侧各 `context_chars` 个字符，返回窗口及掩码的字符偏移
fn window_around_mask(context: &str, context_chars: usize) -> Option<(String, usize)> {
    let mask_start = context.find(MASK)?;
    let mask_end = mask_start + MASK.len();

    let before = &context[..mask_start];
    let after = &context[mask_end..];

    let before_len = before.chars().count();
    let skip = before_len.saturating_sub(context_chars);
    let left: String = before.chars().skip(skip).collect();
    let right: String = after.chars().take(context_chars).collect();

    let mask_position = left.chars().count();
    Some((format!("{}{}{}", left, MASK, right), mask_position))
}

fn usable_token(token: &str) -> bool {
    !token.is_empty()
        && !token.starts_with("##")
        && !token.contains(|c: char| matches!(c, '[' | ']' | '<' | '>'))
        && !SPECIAL_TOKENS.contains(&token)
}

/// 白名单清扫后仍有字母留下
fn survives_sweep(token: &str, allow: &AllowList) -> bool {
    token.chars().any(|c| c.is_alphabetic() && allow.contains(c))
}

/// 取分数最高的可用候选，同分取先返回者
///
/// 会被规则 15 整体删掉的候选（标点、其他文字）直接跳过
pub fn select_candidate(candidates: &[ScoredToken], allow: &AllowList) -> Option<Candidate> {
    let mut best: Option<(String, f32)> = None;

    for candidate in candidates {
        let token = candidate.token.trim().trim_start_matches('\u{2581}');
        if !usable_token(token) || candidate.score.is_nan() {
            continue;
        }
        let token = token.to_lowercase();
        if !survives_sweep(&token, allow) {
            continue;
        }
        match best {
            Some((_, score)) if candidate.score <= score => {}
            _ => best = Some((token, candidate.score)),
        }
    }

    best.map(|(token, score)| Candidate {
        token,
        confidence: (0.0..=1.0).contains(&score).then_some(score),
    })
}
