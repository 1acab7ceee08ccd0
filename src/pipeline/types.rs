// Pipeline 核心类型定义
//
// 定义了批处理所需的所有类型，包括：
// - 单条记录结果 (RecordOutcome)
// - 审计汇总 (AuditSummary)
// - 输出报告 (RunReport)

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::corpus::{CorpusRecord, NormalizedRecord};
use crate::language::{Language, LanguageSource};
use crate::normalize::{NormalizedText, SkipReason};

/// 单条记录的处理状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordStatus {
    Normalized { result: NormalizedText },
    Skipped { reason: SkipReason },
    /// 任务异常退出（不影响其他记录）
    Failed { reason: String },
}

/// 单条记录的处理结果
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    /// 输入顺序
    pub index: usize,
    pub id: String,
    pub language: Language,
    pub language_source: LanguageSource,
    pub source_translation: Option<String>,
    pub metadata: Map<String, Value>,
    pub status: RecordStatus,
}

impl RecordOutcome {
    pub fn is_normalized(&self) -> bool {
        matches!(self.status, RecordStatus::Normalized { .. })
    }

    /// 规范化成功的记录转为语料构建输入
    pub fn into_normalized(self) -> Option<NormalizedRecord> {
        match self.status {
            RecordStatus::Normalized { result } => Some(NormalizedRecord {
                index: self.index,
                id: self.id,
                language: self.language,
                source_translation: self.source_translation,
                normalized: result,
                metadata: self.metadata,
            }),
            _ => None,
        }
    }
}

/// 未进入语料的记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedRecord {
    pub index: usize,
    pub id: String,
    pub language: Language,
    #[serde(flatten)]
    pub status: RecordStatus,
}

/// 一次运行的审计汇总
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub run_id: String,
    /// 输入记录数
    pub total: usize,
    /// 规范化成功数
    pub processed: usize,
    pub skipped_empty: usize,
    pub skipped_marker: usize,
    pub failed: usize,
    pub unresolved_infill: usize,
    pub resolved_infill: usize,
    pub excluded_by_denylist: usize,
    pub included_in_model: usize,
    pub elapsed_ms: u64,
}

impl AuditSummary {
    pub fn from_run(run_id: String, outcomes: &[RecordOutcome], corpus: &[CorpusRecord], elapsed_ms: u64) -> Self {
        let mut summary = AuditSummary {
            run_id,
            total: outcomes.len(),
            elapsed_ms,
            ..Default::default()
        };

        for outcome in outcomes {
            match &outcome.status {
                RecordStatus::Normalized { result } => {
                    summary.processed += 1;
                    summary.unresolved_infill += result.unresolved_count;
                    summary.resolved_infill += result.resolved_count();
                }
                RecordStatus::Skipped {
                    reason: SkipReason::EmptyContent,
                } => summary.skipped_empty += 1,
                RecordStatus::Skipped {
                    reason: SkipReason::SkipMarker,
                } => summary.skipped_marker += 1,
                RecordStatus::Failed { .. } => summary.failed += 1,
            }
        }

        summary.included_in_model = corpus.iter().filter(|r| r.include_in_model).count();
        summary.excluded_by_denylist = corpus.len() - summary.included_in_model;
        summary
    }

    /// 各项计数能否对上
    pub fn is_reconciled(&self) -> bool {
        self.total == self.processed + self.skipped_empty + self.skipped_marker + self.failed
            && self.processed == self.included_in_model + self.excluded_by_denylist
    }
}

/// 输出报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub summary: AuditSummary,
    pub records: Vec<CorpusRecord>,
    pub skipped: Vec<SkippedRecord>,
}
