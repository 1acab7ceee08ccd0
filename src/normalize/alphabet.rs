//! 字符白名单（规则 15）

use std::collections::HashSet;

use crate::config::{AllowListConfig, AllowListsConfig, CharRange, ConfigError};
use crate::language::Language;

/// 编译后的字符白名单
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    ranges: Vec<CharRange>,
    extra: HashSet<char>,
}

impl AllowList {
    pub fn from_config(config: &AllowListConfig) -> Self {
        Self {
            ranges: config.ranges.clone(),
            extra: config.extra.chars().collect(),
        }
    }

    /// 多个白名单的并集
    pub fn union<'a>(lists: impl IntoIterator<Item = &'a AllowList>) -> Self {
        let mut merged = AllowList::default();
        for list in lists {
            for range in &list.ranges {
                if !merged.ranges.contains(range) {
                    merged.ranges.push(*range);
                }
            }
            merged.extra.extend(list.extra.iter().copied());
        }
        merged
    }

    pub fn contains(&self, ch: char) -> bool {
        self.extra.contains(&ch) || self.ranges.iter().any(|r| r.contains(ch))
    }
}

/// 按语言选择白名单；Mixed/Unknown 使用并集
#[derive(Debug, Clone)]
pub struct AlphabetSet {
    latin: AllowList,
    greek: AllowList,
    union: AllowList,
}

impl AlphabetSet {
    pub fn from_config(config: &AllowListsConfig) -> Result<Self, ConfigError> {
        let latin = config
            .latin
            .as_ref()
            .map(AllowList::from_config)
            .ok_or_else(|| ConfigError::Missing("normalization.allow_lists.latin".to_string()))?;
        let greek = config
            .greek
            .as_ref()
            .map(AllowList::from_config)
            .ok_or_else(|| ConfigError::Missing("normalization.allow_lists.greek".to_string()))?;
        let union = AllowList::union([&latin, &greek]);

        Ok(Self {
            latin,
            greek,
            union,
        })
    }

    pub fn for_language(&self, language: Language) -> &AllowList {
        match language {
            Language::Latin => &self.latin,
            Language::Greek => &self.greek,
            Language::Mixed | Language::Unknown => &self.union,
        }
    }
}
