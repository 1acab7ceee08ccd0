// 语料构建：合并译文并按屏蔽短语标记不可建模的记录

use std::collections::HashMap;

use crate::config::{ConfigError, DenylistConfig};
use crate::corpus::denylist::DenylistMatcher;
use crate::corpus::types::{CorpusRecord, NormalizedRecord};
use crate::normalize::MASK;

pub struct CorpusBuilder {
    denylist: DenylistMatcher,
}

impl CorpusBuilder {
    pub fn new(config: &DenylistConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            denylist: DenylistMatcher::new(config)?,
        })
    }

    /// 构建语料记录
    ///
    /// 译文优先级：数据集自带（非空）> 外部译文 > 空串。被屏蔽的记录保留在输出中
    pub fn build(
        &self,
        normalized: &[NormalizedRecord],
        translations: &HashMap<String, String>,
    ) -> Vec<CorpusRecord> {
        let records: Vec<CorpusRecord> = normalized
            .iter()
            .map(|record| self.build_record(record, translations))
            .collect();

        let excluded = records.iter().filter(|r| !r.include_in_model).count();
        tracing::info!(
            "语料构建完成: 共 {} 条，{} 条因译文屏蔽短语不进入建模",
            records.len(),
            excluded
        );
        records
    }

    fn build_record(&self, record: &NormalizedRecord, translations: &HashMap<String, String>) -> CorpusRecord {
        let translation = record
            .source_translation
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| translations.get(&record.id).map(String::as_str))
            .unwrap_or("")
            .to_string();

        let excluded_by = self.denylist.matched_phrase(&translation, record.language);
        if let Some(phrase) = &excluded_by {
            tracing::debug!("记录 {} 译文命中屏蔽短语 \"{}\"", record.id, phrase);
        }

        // 规范化结果理论上不会带掩码，这里再兜底清理一次
        let final_text = if record.normalized.final_text.contains(MASK) {
            tracing::warn!("记录 {} 的最终文本含有掩码残留，已清理", record.id);
            record
                .normalized
                .final_text
                .replace(MASK, "")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            record.normalized.final_text.clone()
        };

        CorpusRecord {
            index: record.index,
            id: record.id.clone(),
            language: record.language,
            cleaned_content: record.normalized.cleaned_content.clone(),
            final_text,
            translation,
            include_in_model: excluded_by.is_none(),
            excluded_by,
            unresolved_count: record.normalized.unresolved_count,
            metadata: record.metadata.clone(),
        }
    }
}
