//! 规范化主引擎
//!
//! 按固定顺序执行 15 条规则：1-13 同步清洗，14 调用补全器，15 按语言白名单清扫

use std::sync::Arc;

use crate::config::{ConfigError, NormalizationConfig};
use crate::infill::{InfillFailure, SpanInfiller};
use crate::language::Language;
use crate::normalize::alphabet::AlphabetSet;
use crate::normalize::rules::{AllowListSweep, RuleSet, TextRule};
use crate::normalize::sentinel::{find_sentinels, MASK};
use crate::normalize::types::{InfillSpan, NormalizedText, RuleOutcome, RuleStep, SkipReason};

/// 规则 1-13 的输出
#[derive(Debug, Clone, PartialEq)]
pub struct Prepared {
    pub cleaned_content: String,
    pub applied_rules: Vec<u8>,
}

/// 每种语言一个白名单清扫器
struct Sweeps {
    latin: AllowListSweep,
    greek: AllowListSweep,
    union: AllowListSweep,
}

impl Sweeps {
    fn new(alphabets: &AlphabetSet) -> Self {
        Self {
            latin: AllowListSweep::new(alphabets.for_language(Language::Latin).clone()),
            greek: AllowListSweep::new(alphabets.for_language(Language::Greek).clone()),
            union: AllowListSweep::new(alphabets.for_language(Language::Unknown).clone()),
        }
    }

    fn for_language(&self, language: Language) -> &AllowListSweep {
        match language {
            Language::Latin => &self.latin,
            Language::Greek => &self.greek,
            Language::Mixed | Language::Unknown => &self.union,
        }
    }
}

/// 规范化引擎（预编译规则，可跨任务共享）
pub struct NormalizationEngine {
    rules: RuleSet,
    sweeps: Sweeps,
    infiller: Option<Arc<SpanInfiller>>,
}

impl NormalizationEngine {
    /// 创建引擎（不含补全器，所有缺失片段保持 `[---]`）
    pub fn new(config: &NormalizationConfig) -> Result<Self, ConfigError> {
        let alphabets = AlphabetSet::from_config(&config.allow_lists)?;
        Ok(Self {
            rules: RuleSet::new(config.skip_token.clone()),
            sweeps: Sweeps::new(&alphabets),
            infiller: None,
        })
    }

    pub fn with_infiller(mut self, infiller: Arc<SpanInfiller>) -> Self {
        self.infiller = Some(infiller);
        self
    }

    /// 单独执行一条同步规则
    ///
    /// 规则 14 需要异步打分服务，这里始终返回 `Unmatched`
    pub fn apply_rule(&self, step: RuleStep, text: &str, language: Language) -> RuleOutcome {
        match step {
            RuleStep::Infill => RuleOutcome::Unmatched,
            RuleStep::AllowList => self.sweeps.for_language(language).apply(text),
            other => self
                .rules
                .get(other)
                .map(|rule| rule.apply(text))
                .unwrap_or(RuleOutcome::Unmatched),
        }
    }

    /// 执行规则 1-13
    pub fn prepare(&self, raw: &str) -> Result<Prepared, SkipReason> {
        let mut text = raw.to_string();
        let mut applied_rules = Vec::new();

        for rule in self.rules.rules() {
            match rule.apply(&text) {
                RuleOutcome::Matched(next) => {
                    applied_rules.push(rule.step().number());
                    text = next;
                }
                RuleOutcome::Unmatched => {}
                RuleOutcome::Rejected(reason) => return Err(reason),
            }
        }

        Ok(Prepared {
            cleaned_content: text,
            applied_rules,
        })
    }

    /// 执行完整规则序列
    pub async fn normalize(&self, raw: &str, language: Language) -> Result<NormalizedText, SkipReason> {
        let Prepared {
            cleaned_content,
            mut applied_rules,
        } = self.prepare(raw)?;

        // 片段位置只在规则 1-13 之后测量
        let (infilled, spans) = self.infill_spans(&cleaned_content, language).await;
        if spans.iter().any(|s| s.resolved) {
            applied_rules.push(RuleStep::Infill.number());
        }

        let final_text = match self.sweeps.for_language(language).apply(&infilled) {
            RuleOutcome::Matched(swept) => {
                applied_rules.push(RuleStep::AllowList.number());
                swept
            }
            RuleOutcome::Unmatched => infilled,
            RuleOutcome::Rejected(reason) => return Err(reason),
        };

        let unresolved_count = spans.iter().filter(|s| !s.resolved).count();

        Ok(NormalizedText {
            cleaned_content,
            final_text,
            spans,
            unresolved_count,
            applied_rules,
        })
    }

    /// 规则 14：从左到右逐个补全，每次替换后重新定位
    ///
    /// 失败的片段保留 `[---]`，因此第 n 个待处理片段就是当前文本中第 `pending_before` 个哨兵
    async fn infill_spans(&self, cleaned: &str, language: Language) -> (String, Vec<InfillSpan>) {
        let mut spans: Vec<InfillSpan> = find_sentinels(cleaned)
            .into_iter()
            .enumerate()
            .map(|(index, position)| InfillSpan::unresolved(index, position))
            .collect();

        if spans.is_empty() {
            return (cleaned.to_string(), spans);
        }

        let infiller = match self.infiller.as_ref().filter(|i| i.has_scorer(language)) {
            Some(infiller) => infiller,
            None => {
                tracing::debug!("语言 {} 无可用打分服务，{} 个缺失片段保持未补全", language, spans.len());
                for span in &mut spans {
                    span.failure = Some(InfillFailure::NoScorer);
                }
                return (cleaned.to_string(), spans);
            }
        };

        let allow = self.sweeps.for_language(language).allow_list();
        let mut text = cleaned.to_string();
        let mut pending_before = 0;

        for span in &mut spans {
            let Some(range) = find_sentinels(&text).get(pending_before).cloned() else {
                span.failure = Some(InfillFailure::MalformedContext);
                continue;
            };

            let mut context = text.clone();
            context.replace_range(range.clone(), MASK);

            match infiller.infill(&context, language, allow).await {
                Ok(candidate) => {
                    text.replace_range(range, &candidate.token);
                    span.resolved = true;
                    span.confidence = candidate.confidence;
                    span.candidate_token = Some(candidate.token);
                }
                Err(failure) => {
                    tracing::debug!("片段 {} 未补全: {}", span.index, failure);
                    span.failure = Some(failure);
                    pending_before += 1;
                }
            }
        }

        (text, spans)
    }
}
