// 语言路由
//
// 元数据优先（languageInEnglish 等字段），缺失或无法识别时按 Unicode 文字统计回退

use serde::{Deserialize, Serialize};

use crate::corpus::Inscription;

/// 记录的工作语言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Latin,
    Greek,
    /// 拉丁/希腊混合
    Mixed,
    /// 无法判定：使用并集白名单，关闭补全
    #[default]
    Unknown,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Latin => "latin",
            Language::Greek => "greek",
            Language::Mixed => "mixed",
            Language::Unknown => "unknown",
        }
    }

    /// 解析元数据中的语言提示
    ///
    /// 返回 None 表示提示缺失或含义不明
    pub fn from_hint(hint: &str) -> Option<Self> {
        let hint = hint.trim().to_lowercase();
        if hint.is_empty() {
            return None;
        }

        let has_latin = hint.contains("latin");
        let has_greek = hint.contains("greek");
        match (has_latin, has_greek) {
            (true, true) => return Some(Language::Mixed),
            (true, false) => return Some(Language::Latin),
            (false, true) => return Some(Language::Greek),
            (false, false) => {}
        }

        match hint.as_str() {
            "la" | "lat" => Some(Language::Latin),
            "grc" | "el" | "gr" => Some(Language::Greek),
            "la/grc" | "grc/la" | "mixed" => Some(Language::Mixed),
            _ => None,
        }
    }

    /// 统计片段中占多数的文字；无字母时返回 Unknown
    pub fn dominant_script(text: &str) -> Self {
        let counts = ScriptCounts::of(text);
        if counts.latin == 0 && counts.greek == 0 {
            Language::Unknown
        } else if counts.greek > counts.latin {
            Language::Greek
        } else {
            Language::Latin
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 判定来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageSource {
    Metadata,
    Script,
    Fallback,
}

#[derive(Debug, Default, Clone, Copy)]
struct ScriptCounts {
    latin: usize,
    greek: usize,
}

impl ScriptCounts {
    fn of(text: &str) -> Self {
        let mut counts = Self::default();
        for ch in text.chars() {
            if is_greek(ch) {
                counts.greek += 1;
            } else if ch.is_alphabetic() && is_latin(ch) {
                counts.latin += 1;
            }
        }
        counts
    }
}

fn is_greek(ch: char) -> bool {
    let code = ch as u32;
    // Greek and Coptic（跳过其中的标点/数字符号）
    ((0x0386..=0x03FF).contains(&code) && ch.is_alphabetic())
        // Greek Extended
        || (0x1F00..=0x1FFF).contains(&code)
}

fn is_latin(ch: char) -> bool {
    let code = ch as u32;
    ch.is_ascii_alphabetic()
        // Latin-1 Supplement / Extended-A / Extended-B
        || (0x00C0..=0x024F).contains(&code)
        // Latin Extended Additional
        || (0x1E00..=0x1EFF).contains(&code)
}

/// 语言路由器（只读，线程间共享）
#[derive(Debug, Clone)]
pub struct LanguageRouter {
    mixed_ratio: f32,
}

impl LanguageRouter {
    /// # Arguments
    /// * `mixed_ratio` - 少数文字占字母总数的比例达到该值时判为 Mixed
    pub fn new(mixed_ratio: f32) -> Self {
        Self { mixed_ratio }
    }

    pub fn classify(&self, inscription: &Inscription) -> Language {
        self.classify_with_source(inscription).0
    }

    /// 判定语言并返回依据；从不失败
    pub fn classify_with_source(&self, inscription: &Inscription) -> (Language, LanguageSource) {
        if let Some(language) = inscription.language_hint.as_deref().and_then(Language::from_hint) {
            return (language, LanguageSource::Metadata);
        }

        let language = self.classify_script(inscription.raw_content.as_deref().unwrap_or(""));
        if language == Language::Unknown {
            tracing::debug!("语言判定失败，回退 Unknown: id={}", inscription.id);
            (Language::Unknown, LanguageSource::Fallback)
        } else {
            (language, LanguageSource::Script)
        }
    }

    /// 按字母所属文字统计
    pub fn classify_script(&self, text: &str) -> Language {
        let counts = ScriptCounts::of(text);
        let total = counts.latin + counts.greek;
        if total == 0 {
            return Language::Unknown;
        }

        let minority = counts.latin.min(counts.greek) as f32 / total as f32;
        if minority >= self.mixed_ratio {
            Language::Mixed
        } else if counts.greek > counts.latin {
            Language::Greek
        } else {
            Language::Latin
        }
    }
}

impl Default for LanguageRouter {
    fn default() -> Self {
        Self::new(0.2)
    }
}
