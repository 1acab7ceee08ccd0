//! 规范化规则定义
//!
//! 每条规则是独立的类型化对象，返回 `Matched(新文本) | Unmatched | Rejected(原因)`，
//! 便于单独测试。规则 14（补全）需要异步打分服务，由引擎单独调度

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use unicode_normalization::UnicodeNormalization;

use crate::normalize::alphabet::AllowList;
use crate::normalize::entities::decode_entities;
use crate::normalize::sentinel::{self, SENTINEL};
use crate::normalize::types::{RuleOutcome, RuleStep, SkipReason};

lazy_static! {
    /// 规则 4：`word(:token)`，word 为整个空白分隔的词（可含补字方括号）
    static ref EDITORIAL_CORRECTION: Regex =
        Regex::new(r"([^\s()]+)\(:([^\s()]+)\)").expect("rule 4 pattern");
    /// 规则 6：`((:token))`
    static ref DOUBLE_PAREN_CORRECTION: Regex =
        Regex::new(r"\(\(:([^\s()]+)\)\)").expect("rule 6 pattern");
    /// 规则 7：`x(yz)`
    static ref ABBREVIATION: Regex =
        Regex::new(r"([^\s()\[\]<>〈〉〚〛]+)\(([^\s():\[\]]+)\)").expect("rule 7 pattern");
    /// 规则 8
    static ref DOUBLE_BRACKET: Regex = Regex::new(r"\[\[([^\[\]]+)\]\]").expect("rule 8 pattern");
    static ref SINGLE_BRACKET: Regex = Regex::new(r"\[([^\[\]]+)\]").expect("rule 8 pattern");
    /// 规则 11
    static ref LINE_BREAK: Regex = Regex::new(r"\r\n|\r|\n").expect("rule 11 pattern");
    /// 规则 12
    static ref ANGLE_SPAN: Regex = Regex::new(r"〈[^〉]*〉|<[^>]*>").expect("rule 12 pattern");
    /// 规则 13
    static ref ERASURE_SPAN: Regex = Regex::new(r"〚[^〛]*〛").expect("rule 13 pattern");
}

/// 哨兵内部文本（`[---]` 去掉方括号）
const SENTINEL_BODY: &str = "---";

/// 同步文本规则
pub trait TextRule: Send + Sync {
    fn step(&self) -> RuleStep;
    fn apply(&self, text: &str) -> RuleOutcome;
}

/// 比较新旧文本，生成结果
fn outcome(original: &str, replaced: String) -> RuleOutcome {
    if replaced == original {
        RuleOutcome::Unmatched
    } else {
        RuleOutcome::Matched(replaced)
    }
}

// ============================================================================
// 记录级门槛（规则 1, 2）
// ============================================================================

pub struct RejectEmpty;

impl TextRule for RejectEmpty {
    fn step(&self) -> RuleStep {
        RuleStep::RejectEmpty
    }

    fn apply(&self, text: &str) -> RuleOutcome {
        if text.trim().is_empty() {
            RuleOutcome::Rejected(SkipReason::EmptyContent)
        } else {
            RuleOutcome::Unmatched
        }
    }
}

pub struct SkipMarker {
    token: Option<String>,
}

impl SkipMarker {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

impl TextRule for SkipMarker {
    fn step(&self) -> RuleStep {
        RuleStep::SkipMarker
    }

    fn apply(&self, text: &str) -> RuleOutcome {
        match &self.token {
            Some(token) if !token.is_empty() && text.contains(token.as_str()) => {
                RuleOutcome::Rejected(SkipReason::SkipMarker)
            }
            _ => RuleOutcome::Unmatched,
        }
    }
}

// ============================================================================
// 实体解码（规则 3）
// ============================================================================

pub struct DecodeEntities;

impl TextRule for DecodeEntities {
    fn step(&self) -> RuleStep {
        RuleStep::DecodeEntities
    }

    fn apply(&self, text: &str) -> RuleOutcome {
        let decoded = decode_entities(text);
        let source = decoded.as_deref().unwrap_or(text);
        // NFC：组合附加符号，保证多调希腊文落入白名单区间
        let composed: String = source.nfc().collect();
        outcome(text, composed)
    }
}

// ============================================================================
// 编辑校正（规则 4）
// ============================================================================

/// `word(:token)` → `token`；含哨兵的词不替换
pub struct EditorialCorrection;

impl TextRule for EditorialCorrection {
    fn step(&self) -> RuleStep {
        RuleStep::EditorialCorrection
    }

    fn apply(&self, text: &str) -> RuleOutcome {
        let replaced = EDITORIAL_CORRECTION.replace_all(text, |caps: &Captures| {
            if caps[1].contains(SENTINEL) {
                caps[0].to_string()
            } else {
                caps[2].to_string()
            }
        });
        outcome(text, replaced.into_owned())
    }
}

// ============================================================================
// 正则替换规则（规则 6, 7, 11）
// ============================================================================

/// 固定模板替换
pub struct PatternRule {
    step: RuleStep,
    pattern: &'static Regex,
    replacement: &'static str,
}

impl PatternRule {
    pub fn double_paren_correction() -> Self {
        Self {
            step: RuleStep::DoubleParenCorrection,
            pattern: &DOUBLE_PAREN_CORRECTION,
            replacement: "${1}",
        }
    }

    pub fn abbreviation() -> Self {
        Self {
            step: RuleStep::ExpandAbbreviation,
            pattern: &ABBREVIATION,
            replacement: "${1}${2}",
        }
    }

    pub fn line_breaks() -> Self {
        Self {
            step: RuleStep::LineBreaks,
            pattern: &LINE_BREAK,
            replacement: ", ",
        }
    }
}

impl TextRule for PatternRule {
    fn step(&self) -> RuleStep {
        self.step
    }

    fn apply(&self, text: &str) -> RuleOutcome {
        outcome(text, self.pattern.replace_all(text, self.replacement).into_owned())
    }
}

// ============================================================================
// 单字符删除（规则 5, 10）
// ============================================================================

pub struct StripChar {
    step: RuleStep,
    ch: char,
}

impl StripChar {
    pub fn uncertainty() -> Self {
        Self {
            step: RuleStep::StripUncertainty,
            ch: '?',
        }
    }

    pub fn plus() -> Self {
        Self {
            step: RuleStep::StripPlus,
            ch: '+',
        }
    }
}

impl TextRule for StripChar {
    fn step(&self) -> RuleStep {
        self.step
    }

    fn apply(&self, text: &str) -> RuleOutcome {
        if !text.contains(self.ch) {
            return RuleOutcome::Unmatched;
        }
        RuleOutcome::Matched(text.replace(self.ch, ""))
    }
}

// ============================================================================
// 方括号解包（规则 8）
// ============================================================================

pub struct UnwrapBrackets;

impl UnwrapBrackets {
    fn unwrap_once(text: &str) -> String {
        let pass = DOUBLE_BRACKET.replace_all(text, |caps: &Captures| {
            if &caps[1] == SENTINEL_BODY {
                // `[[---]]` 归并为哨兵
                SENTINEL.to_string()
            } else {
                caps[1].to_string()
            }
        });
        SINGLE_BRACKET
            .replace_all(&pass, |caps: &Captures| {
                if &caps[1] == SENTINEL_BODY {
                    caps[0].to_string()
                } else {
                    caps[1].to_string()
                }
            })
            .into_owned()
    }
}

impl TextRule for UnwrapBrackets {
    fn step(&self) -> RuleStep {
        RuleStep::UnwrapBrackets
    }

    fn apply(&self, text: &str) -> RuleOutcome {
        // 嵌套括号逐层解开，直到不再变化（每轮至少减少一对括号，必然终止）
        let mut current = text.to_string();
        loop {
            let next = Self::unwrap_once(&current);
            if next == current {
                break;
            }
            current = next;
        }
        outcome(text, current)
    }
}

// ============================================================================
// 小写（规则 9）
// ============================================================================

pub struct Lowercase;

impl TextRule for Lowercase {
    fn step(&self) -> RuleStep {
        RuleStep::Lowercase
    }

    fn apply(&self, text: &str) -> RuleOutcome {
        outcome(text, text.to_lowercase())
    }
}

// ============================================================================
// 定界片段删除（规则 12, 13）
// ============================================================================

/// 删除定界符及其内容；片段内的哨兵保留在原位置
pub struct DelimitedSpan {
    step: RuleStep,
    pattern: &'static Regex,
}

impl DelimitedSpan {
    pub fn angle() -> Self {
        Self {
            step: RuleStep::AngleSpans,
            pattern: &ANGLE_SPAN,
        }
    }

    pub fn erasure() -> Self {
        Self {
            step: RuleStep::ErasureSpans,
            pattern: &ERASURE_SPAN,
        }
    }
}

impl TextRule for DelimitedSpan {
    fn step(&self) -> RuleStep {
        self.step
    }

    fn apply(&self, text: &str) -> RuleOutcome {
        let replaced = self
            .pattern
            .replace_all(text, |caps: &Captures| sentinel::sentinels_within(&caps[0]));
        outcome(text, replaced.into_owned())
    }
}

// ============================================================================
// 白名单清扫（规则 15）
// ============================================================================

/// 删除白名单外字符、折叠空白；哨兵不受影响
pub struct AllowListSweep {
    allow: AllowList,
}

impl AllowListSweep {
    pub fn new(allow: AllowList) -> Self {
        Self { allow }
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow
    }

    fn sweep_fragment(&self, fragment: &str) -> String {
        fragment
            .chars()
            .map(|ch| if ch.is_whitespace() { ' ' } else { ch })
            .filter(|ch| self.allow.contains(*ch))
            .collect()
    }
}

impl TextRule for AllowListSweep {
    fn step(&self) -> RuleStep {
        RuleStep::AllowList
    }

    fn apply(&self, text: &str) -> RuleOutcome {
        let swept = sentinel::map_outside_sentinels(text, |fragment| self.sweep_fragment(fragment));
        let folded = fold_whitespace(&swept);
        if folded.is_empty() {
            return RuleOutcome::Rejected(SkipReason::EmptyContent);
        }
        outcome(text, folded)
    }
}

/// 空白折叠：多个连续空格 -> 单个空格，去除首尾
fn fold_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut prev_whitespace = false;

    for ch in text.chars() {
        if ch == ' ' {
            if !prev_whitespace {
                result.push(' ');
                prev_whitespace = true;
            }
        } else {
            result.push(ch);
            prev_whitespace = false;
        }
    }

    result.trim().to_string()
}

// ============================================================================
// 规则序列
// ============================================================================

/// 规则 1-13 的固定序列
pub struct RuleSet {
    rules: Vec<Box<dyn TextRule>>,
}

impl RuleSet {
    pub fn new(skip_token: Option<String>) -> Self {
        let rules: Vec<Box<dyn TextRule>> = vec![
            Box::new(RejectEmpty),
            Box::new(SkipMarker::new(skip_token)),
            Box::new(DecodeEntities),
            Box::new(EditorialCorrection),
            Box::new(StripChar::uncertainty()),
            Box::new(PatternRule::double_paren_correction()),
            Box::new(PatternRule::abbreviation()),
            Box::new(UnwrapBrackets),
            Box::new(Lowercase),
            Box::new(StripChar::plus()),
            Box::new(PatternRule::line_breaks()),
            Box::new(DelimitedSpan::angle()),
            Box::new(DelimitedSpan::erasure()),
        ];
        Self { rules }
    }

    pub fn rules(&self) -> &[Box<dyn TextRule>] {
        &self.rules
    }

    pub fn get(&self, step: RuleStep) -> Option<&dyn TextRule> {
        self.rules
            .iter()
            .find(|r| r.step() == step)
            .map(|r| r.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NormalizationConfig;
    use crate::language::Language;
    use crate::normalize::alphabet::AlphabetSet;

    fn apply(rule: &dyn TextRule, text: &str) -> String {
        match rule.apply(text) {
            RuleOutcome::Matched(s) => s,
            RuleOutcome::Unmatched => text.to_string(),
            RuleOutcome::Rejected(reason) => panic!("unexpected rejection: {}", reason),
        }
    }

    fn latin_sweep() -> AllowListSweep {
        let set = AlphabetSet::from_config(&NormalizationConfig::default().allow_lists).unwrap();
        AllowListSweep::new(set.for_language(Language::Latin).clone())
    }

    #[test]
    fn test_rule_set_order() {
        let set = RuleSet::new(None);
        let steps: Vec<RuleStep> = set.rules().iter().map(|r| r.step()).collect();
        assert_eq!(steps, RuleStep::ALL[..13].to_vec());
    }

    #[test]
    fn test_reject_empty() {
        assert_eq!(
            RejectEmpty.apply("  \n\t "),
            RuleOutcome::Rejected(SkipReason::EmptyContent)
        );
        assert_eq!(RejectEmpty.apply("a"), RuleOutcome::Unmatched);
    }

    #[test]
    fn test_skip_marker_is_case_sensitive() {
        let rule = SkipMarker::new(Some("ABC".to_string()));
        assert_eq!(
            rule.apply("ABCDEFG"),
            RuleOutcome::Rejected(SkipReason::SkipMarker)
        );
        assert_eq!(rule.apply("abcdefg"), RuleOutcome::Unmatched);
        assert_eq!(SkipMarker::new(None).apply("ABC"), RuleOutcome::Unmatched);
    }

    #[test]
    fn test_decode_entities_and_compose() {
        assert_eq!(apply(&DecodeEntities, "a &lt;b&gt;"), "a <b>");
        // α + 组合重音 → ά
        assert_eq!(apply(&DecodeEntities, "\u{03B1}\u{0301}"), "\u{03AC}");
        assert_eq!(DecodeEntities.apply("plain"), RuleOutcome::Unmatched);
    }

    #[test]
    fn test_editorial_correction() {
        let rule = EditorialCorrection;
        assert_eq!(apply(&rule, "A(:b)"), "b");
        assert_eq!(apply(&rule, "salve Pupa(:Puppa) mea"), "salve Puppa mea");
        // 补字方括号属于同一个词，整体被替换
        assert_eq!(apply(&rule, "salve [Pu]pa(:Puppa) mea"), "salve Puppa mea");
        assert_eq!(apply(&rule, "[Pupa](:Puppa)"), "Puppa");
        // 含哨兵的词不替换
        assert_eq!(rule.apply("[---](:x)"), RuleOutcome::Unmatched);
        assert_eq!(rule.apply("a[---]b(:x)"), RuleOutcome::Unmatched);
        // 不匹配的形状原样保留
        assert_eq!(rule.apply("(:b)"), RuleOutcome::Unmatched);
        assert_eq!(rule.apply("a(:b c)"), RuleOutcome::Unmatched);
        assert_eq!(rule.apply("((:abc))"), RuleOutcome::Unmatched);
    }

    #[test]
    fn test_double_paren_correction() {
        let rule = PatternRule::double_paren_correction();
        assert_eq!(apply(&rule, "x ((:abc)) y"), "x abc y");
        assert_eq!(rule.apply("((: a b))"), RuleOutcome::Unmatched);
    }

    #[test]
    fn test_abbreviation() {
        let rule = PatternRule::abbreviation();
        assert_eq!(apply(&rule, "M(arcus) T(ullius)"), "Marcus Tullius");
        assert_eq!(apply(&rule, "a(b)c(d)"), "abcd");
        assert_eq!(rule.apply("a(b c)"), RuleOutcome::Unmatched);
        assert_eq!(rule.apply("(yz)"), RuleOutcome::Unmatched);
        assert_eq!(rule.apply("[---](abc)"), RuleOutcome::Unmatched);
    }

    #[test]
    fn test_unwrap_brackets() {
        assert_eq!(apply(&UnwrapBrackets, "[abc]"), "abc");
        assert_eq!(apply(&UnwrapBrackets, "[[abc]]"), "abc");
        assert_eq!(apply(&UnwrapBrackets, "[ab c]"), "ab c");
        assert_eq!(UnwrapBrackets.apply("[---]"), RuleOutcome::Unmatched);
        assert_eq!(apply(&UnwrapBrackets, "[[---]]"), "[---]");
        assert_eq!(apply(&UnwrapBrackets, "[[a] b]"), "a b");
        assert_eq!(apply(&UnwrapBrackets, "sal[ve] [---] [Luci]"), "salve [---] Luci");
    }

    #[test]
    fn test_strip_chars() {
        assert_eq!(apply(&StripChar::uncertainty(), "a?b?"), "ab");
        assert_eq!(apply(&StripChar::plus(), "+a+"), "a");
        assert_eq!(StripChar::plus().apply("ab"), RuleOutcome::Unmatched);
    }

    #[test]
    fn test_line_breaks() {
        let rule = PatternRule::line_breaks();
        assert_eq!(apply(&rule, "a\nb\r\nc\rd"), "a, b, c, d");
    }

    #[test]
    fn test_delimited_spans_keep_sentinels() {
        let angle = DelimitedSpan::angle();
        assert_eq!(apply(&angle, "salve<ignore this>mark"), "salvemark");
        assert_eq!(apply(&angle, "a〈b c〉d"), "ad");
        assert_eq!(apply(&angle, "a<x [---] y>b"), "a[---]b");

        let erasure = DelimitedSpan::erasure();
        assert_eq!(apply(&erasure, "a〚erased〛b"), "ab");
        assert_eq!(erasure.apply("a<b>"), RuleOutcome::Unmatched);
    }

    #[test]
    fn test_allow_list_sweep() {
        let sweep = latin_sweep();
        assert_eq!(apply(&sweep, "a-b  (c)  d"), "ab c d");
        assert_eq!(apply(&sweep, "ab[---]c-d"), "ab[---]cd");
        assert_eq!(sweep.apply("salve, mea"), RuleOutcome::Unmatched);
        assert_eq!(
            sweep.apply("123 --"),
            RuleOutcome::Rejected(SkipReason::EmptyContent)
        );
    }
}
