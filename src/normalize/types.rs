//! 规范化类型定义

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::infill::InfillFailure;

/// 规则序号（顺序即执行顺序，不可调整）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStep {
    /// 1. 空内容拒绝
    RejectEmpty,
    /// 2. 跳过标记
    SkipMarker,
    /// 3. HTML/XML 实体解码
    DecodeEntities,
    /// 4. `word(:token)` → `token`
    EditorialCorrection,
    /// 5. 去除 `?`
    StripUncertainty,
    /// 6. `((:token))` → `token`
    DoubleParenCorrection,
    /// 7. `x(yz)` → `xyz`
    ExpandAbbreviation,
    /// 8. 方括号解包（保留 `[---]`）
    UnwrapBrackets,
    /// 9. 小写
    Lowercase,
    /// 10. 去除 `+`
    StripPlus,
    /// 11. 换行 → `, `
    LineBreaks,
    /// 12. 删除 `〈…〉` / `<…>`
    AngleSpans,
    /// 13. 删除 `〚…〛`
    ErasureSpans,
    /// 14. 掩码补全
    Infill,
    /// 15. 字符白名单清扫
    AllowList,
}

impl RuleStep {
    /// 完整规则序列
    pub const ALL: [RuleStep; 15] = [
        RuleStep::RejectEmpty,
        RuleStep::SkipMarker,
        RuleStep::DecodeEntities,
        RuleStep::EditorialCorrection,
        RuleStep::StripUncertainty,
        RuleStep::DoubleParenCorrection,
        RuleStep::ExpandAbbreviation,
        RuleStep::UnwrapBrackets,
        RuleStep::Lowercase,
        RuleStep::StripPlus,
        RuleStep::LineBreaks,
        RuleStep::AngleSpans,
        RuleStep::ErasureSpans,
        RuleStep::Infill,
        RuleStep::AllowList,
    ];

    /// 规则编号（1 起）
    pub fn number(&self) -> u8 {
        RuleStep::ALL
            .iter()
            .position(|s| s == self)
            .map(|i| i as u8 + 1)
            .unwrap_or(0)
    }

    pub fn from_number(number: u8) -> Option<Self> {
        RuleStep::ALL.get(usize::from(number).checked_sub(1)?).copied()
    }
}

/// 记录级排除原因（非故障）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// 空内容或清洗后为空
    EmptyContent,
    /// 包含跳过标记
    SkipMarker,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::EmptyContent => f.write_str("empty_content"),
            SkipReason::SkipMarker => f.write_str("skip_marker"),
        }
    }
}

/// 单条规则的执行结果
#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    /// 命中并产生新文本
    Matched(String),
    /// 形状不符，原文不变
    Unmatched,
    /// 整条记录被排除
    Rejected(SkipReason),
}

/// 缺失片段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfillSpan {
    /// 逻辑序号（从左到右，补全过程中不变）
    pub index: usize,
    /// `cleaned_content` 中的字节区间（规则 1-13 之后测得）
    pub position: Range<usize>,
    pub resolved: bool,
    pub candidate_token: Option<String>,
    /// 0..1，服务端分数不是概率时为空
    pub confidence: Option<f32>,
    /// 未补全原因
    pub failure: Option<InfillFailure>,
}

impl InfillSpan {
    pub fn unresolved(index: usize, position: Range<usize>) -> Self {
        Self {
            index,
            position,
            resolved: false,
            candidate_token: None,
            confidence: None,
            failure: None,
        }
    }
}

/// 规范化结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedText {
    /// 规则 1-13 的输出，`spans` 的位置以此为准
    pub cleaned_content: String,
    /// 规则 14-15 的输出
    pub final_text: String,
    pub spans: Vec<InfillSpan>,
    pub unresolved_count: usize,
    /// 实际改动了文本的规则编号
    pub applied_rules: Vec<u8>,
}

impl NormalizedText {
    pub fn resolved_count(&self) -> usize {
        self.spans.len() - self.unresolved_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_numbers() {
        assert_eq!(RuleStep::RejectEmpty.number(), 1);
        assert_eq!(RuleStep::UnwrapBrackets.number(), 8);
        assert_eq!(RuleStep::Infill.number(), 14);
        assert_eq!(RuleStep::AllowList.number(), 15);
        assert_eq!(RuleStep::from_number(9), Some(RuleStep::Lowercase));
        assert_eq!(RuleStep::from_number(0), None);
        assert_eq!(RuleStep::from_number(16), None);
    }

    #[test]
    fn test_order_is_total() {
        let mut sorted = RuleStep::ALL;
        sorted.sort();
        assert_eq!(sorted, RuleStep::ALL);
    }
}
