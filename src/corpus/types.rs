// 语料数据类型

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::language::Language;
use crate::normalize::NormalizedText;

/// 输入铭文（加载后只读）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inscription {
    pub id: String,
    /// 原始文本，缺失时按空内容处理
    pub raw_content: Option<String>,
    /// 数据集自带译文
    pub source_translation: Option<String>,
    /// 元数据中的语言提示（如 `languageInEnglish`）
    pub language_hint: Option<String>,
    /// 其余列，原样透传
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

/// 规范化成功的记录，供语料构建使用
#[derive(Debug, Clone)]
pub struct NormalizedRecord {
    /// 输入顺序
    pub index: usize,
    pub id: String,
    pub language: Language,
    pub source_translation: Option<String>,
    pub normalized: NormalizedText,
    pub metadata: Map<String, Value>,
}

/// 最终语料记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub index: usize,
    pub id: String,
    pub language: Language,
    pub cleaned_content: String,
    pub final_text: String,
    pub translation: String,
    /// false 时仍保留在语料中，仅不进入建模
    pub include_in_model: bool,
    /// 命中的屏蔽短语
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_by: Option<String>,
    pub unresolved_count: usize,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}
