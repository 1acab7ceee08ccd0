// src/config.rs

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::language::Language;

// ============================================================================
// 配置错误
// ============================================================================

/// 配置级错误（启动时致命）
///
/// 记录级问题（空内容、跳过标记、补全失败）不在此列，它们只影响单条记录
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("缺少必需配置: {0}")]
    Missing(String),
    #[error("{language} 字符白名单包含标注符号 {ch:?}")]
    InvalidAllowList { language: String, ch: char },
    #[error("配置无效 {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// 白名单中禁止出现的字符：这些符号由规则 3-13 处理，放行会破坏幂等性
const MARKUP_CHARS: &[char] = &[
    '[', ']', '(', ')', '<', '>', '?', '+', '&', '〈', '〉', '〚', '〛',
];

// ============================================================================
// 字符白名单（规则 15）
// ============================================================================

/// 闭区间字符范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharRange {
    pub from: char,
    pub to: char,
}

impl CharRange {
    pub const fn new(from: char, to: char) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, ch: char) -> bool {
        self.from <= ch && ch <= self.to
    }
}

/// 单一语言的字符白名单
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllowListConfig {
    /// 字母区间
    #[serde(default)]
    pub ranges: Vec<CharRange>,
    /// 额外放行的单个字符（空格、标点）
    #[serde(default)]
    pub extra: String,
}

impl AllowListConfig {
    /// 遍历白名单中的所有字符（用于校验）
    fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.ranges
            .iter()
            .flat_map(|r| r.from..=r.to)
            .chain(self.extra.chars())
    }

    fn validate(&self, language: &str) -> Result<(), ConfigError> {
        for range in &self.ranges {
            if range.from > range.to {
                return Err(ConfigError::Invalid {
                    field: format!("allow_lists.{}.ranges", language),
                    reason: format!("区间起点 {:?} 大于终点 {:?}", range.from, range.to),
                });
            }
        }
        if let Some(ch) = self
            .chars()
            .find(|c| MARKUP_CHARS.contains(c) || c.is_control())
        {
            return Err(ConfigError::InvalidAllowList {
                language: language.to_string(),
                ch,
            });
        }
        Ok(())
    }
}

/// 各语言字符白名单
///
/// 缺失任一语言即为 `ConfigError::Missing`，不做静默回退
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllowListsConfig {
    #[serde(default)]
    pub latin: Option<AllowListConfig>,
    #[serde(default)]
    pub greek: Option<AllowListConfig>,
}

fn default_latin_allow_list() -> AllowListConfig {
    AllowListConfig {
        ranges: vec![CharRange::new('a', 'z')],
        extra: " ,.".to_string(),
    }
}

fn default_greek_allow_list() -> AllowListConfig {
    AllowListConfig {
        ranges: vec![
            // 带重音的单字母（ά έ ή ί）
            CharRange::new('\u{03AC}', '\u{03AF}'),
            // α..ω，含词尾 ς
            CharRange::new('\u{03B1}', '\u{03C9}'),
            // ϊ ϋ ό ύ ώ
            CharRange::new('\u{03CA}', '\u{03CE}'),
            // 多调希腊文扩展区
            CharRange::new('\u{1F00}', '\u{1FFF}'),
        ],
        extra: " ,.".to_string(),
    }
}

// ============================================================================
// 规范化配置
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationConfig {
    /// 跳过标记：原文包含即排除整条记录（大小写敏感），None 表示关闭规则 2
    #[serde(default = "default_skip_token")]
    pub skip_token: Option<String>,
    /// 字符白名单
    #[serde(default)]
    pub allow_lists: AllowListsConfig,
    /// 脚本判定为 Mixed 的少数文字占比下限
    #[serde(default = "default_mixed_script_ratio")]
    pub mixed_script_ratio: f32,
}

fn default_skip_token() -> Option<String> {
    Some("ABC".to_string())
}

fn default_mixed_script_ratio() -> f32 {
    0.2
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            skip_token: default_skip_token(),
            allow_lists: AllowListsConfig {
                latin: Some(default_latin_allow_list()),
                greek: Some(default_greek_allow_list()),
            },
            mixed_script_ratio: default_mixed_script_ratio(),
        }
    }
}

// ============================================================================
// 翻译黑名单
// ============================================================================

/// 低信息量翻译短语（按语言）
///
/// 匹配语义：大小写不敏感的子串包含
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DenylistConfig {
    #[serde(default)]
    pub latin: Option<Vec<String>>,
    #[serde(default)]
    pub greek: Option<Vec<String>>,
}

impl DenylistConfig {
    /// 获取某语言的短语列表；Mixed/Unknown 使用并集
    pub fn phrases_for(&self, language: Language) -> Vec<String> {
        let latin = self.latin.as_deref().unwrap_or_default();
        let greek = self.greek.as_deref().unwrap_or_default();
        match language {
            Language::Latin => latin.to_vec(),
            Language::Greek => greek.to_vec(),
            Language::Mixed | Language::Unknown => {
                let mut all = latin.to_vec();
                all.extend(greek.iter().cloned());
                all
            }
        }
    }
}

fn default_latin_denylist() -> Vec<String> {
    vec![
        "letter".to_string(),
        "unknown meaning".to_string(),
        "beginning of a word".to_string(),
        "abbreviation".to_string(),
    ]
}

fn default_greek_denylist() -> Vec<String> {
    vec![
        "alphabet".to_string(),
        "incomprehensible series of characters".to_string(),
    ]
}

// ============================================================================
// 补全（掩码语言模型）配置
// ============================================================================

/// 单个语言的打分服务端点
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorerEndpointConfig {
    /// 服务地址
    pub endpoint: String,
    /// API Key（可为空）
    #[serde(default)]
    pub api_key: String,
    /// 模型名称（转发给服务端，可为空）
    #[serde(default)]
    pub model: String,
    /// 模型词表中的掩码符号，发送前替换 `[MASK]`
    #[serde(default = "default_mask_token")]
    pub mask_token: String,
}

fn default_mask_token() -> String {
    "[MASK]".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfillConfig {
    /// 是否启用规则 14
    #[serde(default = "default_enable_infill")]
    pub enabled: bool,
    /// 拉丁文打分服务
    #[serde(default)]
    pub latin: Option<ScorerEndpointConfig>,
    /// 希腊文打分服务
    #[serde(default)]
    pub greek: Option<ScorerEndpointConfig>,
    /// 单次调用超时（毫秒）
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// 同时在途的打分请求上限
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    /// 掩码两侧保留的上下文字符数
    #[serde(default = "default_context_chars")]
    pub context_chars: usize,
    /// 请求的候选数量
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_enable_infill() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_max_in_flight() -> usize {
    4
}

fn default_context_chars() -> usize {
    256
}

fn default_top_k() -> usize {
    5
}

impl Default for InfillConfig {
    fn default() -> Self {
        Self {
            enabled: default_enable_infill(),
            latin: None,
            greek: None,
            timeout_ms: default_timeout_ms(),
            max_in_flight: default_max_in_flight(),
            context_chars: default_context_chars(),
            top_k: default_top_k(),
        }
    }
}

// ============================================================================
// 批处理配置
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// 并发处理的记录数上限
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

// ============================================================================
// 应用配置
// ============================================================================

/// 一次运行的不可变配置快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub normalization: NormalizationConfig,
    #[serde(default)]
    pub denylist: DenylistConfig,
    #[serde(default)]
    pub infill: InfillConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            normalization: NormalizationConfig::default(),
            denylist: DenylistConfig {
                latin: Some(default_latin_denylist()),
                greek: Some(default_greek_denylist()),
            },
            infill: InfillConfig::default(),
            batch: BatchConfig::default(),
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法获取配置目录"))?;
        let app_dir = config_dir.join("GraffitiPrep");
        std::fs::create_dir_all(&app_dir)?;
        Ok(app_dir.join("config.json"))
    }

    /// 从默认路径加载
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// 从指定路径加载；文件不存在时返回默认配置
    ///
    /// 文件存在但缺少黑名单/白名单时不会补默认值，由 `validate` 报错
    pub fn load_from(path: &Path) -> Result<Self> {
        tracing::info!("尝试从以下路径加载配置: {:?}", path);

        if !path.exists() {
            tracing::warn!("配置文件不存在，使用默认配置");
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("解析配置文件失败 {:?}: {}", path, e))?;
        Ok(config)
    }

    /// 启动前校验，任何错误都应终止运行
    pub fn validate(&self) -> Result<(), ConfigError> {
        let allow = &self.normalization.allow_lists;
        allow
            .latin
            .as_ref()
            .ok_or_else(|| ConfigError::Missing("normalization.allow_lists.latin".to_string()))?
            .validate("latin")?;
        allow
            .greek
            .as_ref()
            .ok_or_else(|| ConfigError::Missing("normalization.allow_lists.greek".to_string()))?
            .validate("greek")?;

        if self.denylist.latin.is_none() {
            return Err(ConfigError::Missing("denylist.latin".to_string()));
        }
        if self.denylist.greek.is_none() {
            return Err(ConfigError::Missing("denylist.greek".to_string()));
        }

        if let Some(token) = &self.normalization.skip_token {
            if token.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    field: "normalization.skip_token".to_string(),
                    reason: "不能为空字符串，关闭请设为 null".to_string(),
                });
            }
            // 输出文本已全部小写，不含大写字母的标记会出现在输出中，二次处理时被拒绝
            if !token.chars().any(char::is_uppercase) {
                return Err(ConfigError::Invalid {
                    field: "normalization.skip_token".to_string(),
                    reason: format!("必须包含大写字母，实际为 {:?}", token),
                });
            }
        }

        let ratio = self.normalization.mixed_script_ratio;
        if !(ratio > 0.0 && ratio <= 0.5) {
            return Err(ConfigError::Invalid {
                field: "normalization.mixed_script_ratio".to_string(),
                reason: format!("应在 (0, 0.5] 内，实际为 {}", ratio),
            });
        }

        if self.batch.workers == 0 {
            return Err(ConfigError::Invalid {
                field: "batch.workers".to_string(),
                reason: "至少为 1".to_string(),
            });
        }
        if self.infill.max_in_flight == 0 {
            return Err(ConfigError::Invalid {
                field: "infill.max_in_flight".to_string(),
                reason: "至少为 1".to_string(),
            });
        }
        if self.infill.timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "infill.timeout_ms".to_string(),
                reason: "必须大于 0".to_string(),
            });
        }
        if self.infill.top_k == 0 {
            return Err(ConfigError::Invalid {
                field: "infill.top_k".to_string(),
                reason: "至少为 1".to_string(),
            });
        }

        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tracing::info!("保存配置到: {:?}", path);

        // 原子写入：先写临时文件，再替换
        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content).map_err(|e| {
            tracing::error!("写入临时文件失败: {}", e);
            e
        })?;

        if let Err(e) = std::fs::rename(&temp_path, path) {
            tracing::error!("重命名临时文件失败: {}", e);
            let _ = std::fs::remove_file(&temp_path);
            return Err(e.into());
        }

        tracing::info!("配置保存成功");
        Ok(())
    }
}
