//! 铭文文本规范化
//!
//! 固定顺序的 15 条清洗规则，`[---]` 哨兵在规则 14 之前始终保持不变
//!
//! ## 处理流程
//! 1. 记录级门槛（空内容、跳过标记）
//! 2. 实体解码 + NFC
//! 3. 编辑符号处理（更正、缩写展开、方括号解包、小写等）
//! 4. 删除定界片段（保留其中的哨兵）
//! 5. 缺失片段补全（可选，依赖打分服务）
//! 6. 按语言白名单清扫

pub mod alphabet;
pub mod engine;
pub mod entities;
pub mod rules;
pub mod sentinel;
pub mod types;

pub use engine::{NormalizationEngine, Prepared};
pub use sentinel::{MASK, SENTINEL};
pub use types::{InfillSpan, NormalizedText, RuleOutcome, RuleStep, SkipReason};
