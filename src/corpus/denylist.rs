// 译文屏蔽短语匹配
//
// 译文中出现这些短语（不区分大小写）说明铭文没有可建模的语言内容，
// 例如 "alphabet"、"unknown meaning"

use aho_corasick::{AhoCorasick, MatchKind};

use crate::config::{ConfigError, DenylistConfig};
use crate::language::Language;

/// 单个语言的短语自动机
struct PhraseMatcher {
    phrases: Vec<String>,
    automaton: Option<AhoCorasick>,
}

impl PhraseMatcher {
    fn new(language: &str, phrases: Vec<String>) -> Result<Self, ConfigError> {
        let phrases: Vec<String> = phrases
            .into_iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();

        if phrases.is_empty() {
            return Ok(Self {
                phrases,
                automaton: None,
            });
        }

        let automaton = AhoCorasick::builder()
            .match_kind(MatchKind::LeftmostFirst)
            .build(&phrases)
            .map_err(|e| ConfigError::Invalid {
                field: format!("denylist.{}", language),
                reason: e.to_string(),
            })?;

        Ok(Self {
            phrases,
            automaton: Some(automaton),
        })
    }

    fn find(&self, haystack: &str) -> Option<&str> {
        let automaton = self.automaton.as_ref()?;
        let found = automaton.find(haystack)?;
        self.phrases.get(found.pattern().as_usize()).map(String::as_str)
    }
}

/// 按语言选择短语表；Mixed/Unknown 使用并集
pub struct DenylistMatcher {
    latin: PhraseMatcher,
    greek: PhraseMatcher,
    union: PhraseMatcher,
}

impl DenylistMatcher {
    pub fn new(config: &DenylistConfig) -> Result<Self, ConfigError> {
        let latin = config
            .latin
            .clone()
            .ok_or_else(|| ConfigError::Missing("denylist.latin".to_string()))?;
        let greek = config
            .greek
            .clone()
            .ok_or_else(|| ConfigError::Missing("denylist.greek".to_string()))?;

        Ok(Self {
            latin: PhraseMatcher::new("latin", latin)?,
            greek: PhraseMatcher::new("greek", greek)?,
            union: PhraseMatcher::new("union", config.phrases_for(Language::Unknown))?,
        })
    }

    /// 返回译文命中的第一个屏蔽短语
    pub fn matched_phrase(&self, translation: &str, language: Language) -> Option<String> {
        let haystack = translation.to_lowercase();
        let matcher = match language {
            Language::Latin => &self.latin,
            Language::Greek => &self.greek,
            Language::Mixed | Language::Unknown => &self.union,
        };
        matcher.find(&haystack).map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn matcher() -> DenylistMatcher {
        DenylistMatcher::new(&AppConfig::new().denylist).unwrap()
    }

    #[test]
    fn test_greek_phrase_case_insensitive() {
        let m = matcher();
        assert_eq!(
            m.matched_phrase("An INCOMPREHENSIBLE series of characters", Language::Greek).as_deref(),
            Some("incomprehensible series of characters")
        );
        assert_eq!(m.matched_phrase("Greetings, friend", Language::Greek), None);
    }

    #[test]
    fn test_language_specific_lists() {
        let m = matcher();
        // "letter" 只在拉丁文短语表中
        assert!(m.matched_phrase("a single letter", Language::Latin).is_some());
        assert!(m.matched_phrase("a single letter", Language::Greek).is_none());
        assert!(m.matched_phrase("a single letter", Language::Unknown).is_some());
        assert!(m.matched_phrase("the greek alphabet", Language::Mixed).is_some());
    }

    #[test]
    fn test_latin_low_information_descriptions() {
        let m = matcher();
        assert_eq!(
            m.matched_phrase("Abbreviation of a personal name", Language::Latin).as_deref(),
            Some("abbreviation")
        );
        // 复数形式按子串命中
        assert_eq!(
            m.matched_phrase("Isolated letters", Language::Latin).as_deref(),
            Some("letter")
        );
        assert_eq!(m.matched_phrase("Greetings to Puppa", Language::Latin), None);
    }

    #[test]
    fn test_empty_list_matches_nothing() {
        let config = DenylistConfig {
            latin: Some(vec![]),
            greek: Some(vec!["  ".to_string()]),
        };
        let m = DenylistMatcher::new(&config).unwrap();
        assert_eq!(m.matched_phrase("anything", Language::Latin), None);
        assert_eq!(m.matched_phrase("anything", Language::Mixed), None);
    }

    #[test]
    fn test_missing_list_is_config_error() {
        let config = DenylistConfig {
            latin: Some(vec![]),
            greek: None,
        };
        assert!(matches!(
            DenylistMatcher::new(&config),
            Err(ConfigError::Missing(_))
        ));
    }
}
