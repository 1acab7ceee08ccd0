// 语料读写
//
// 输入：JSON 数组或 JSON Lines，每行一个对象；列名兼容数据集导出的驼峰命名
// 输出：JSON 报告 + 每行一条建模文本的纯文本文件

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::corpus::types::{CorpusRecord, Inscription};

const ID_KEYS: &[&str] = &["id", "agpId", "graffitiId"];
const CONTENT_KEYS: &[&str] = &["content"];
const TRANSLATION_KEYS: &[&str] = &["contentTranslation", "translation"];
const LANGUAGE_KEYS: &[&str] = &["languageInEnglish", "languageHint"];

/// 读取铭文文件
pub fn load_inscriptions(path: &Path) -> Result<Vec<Inscription>> {
    tracing::info!("加载铭文: {:?}", path);
    let content = std::fs::read_to_string(path).with_context(|| format!("读取输入文件失败: {:?}", path))?;
    let inscriptions = parse_inscriptions(&content).with_context(|| format!("解析输入文件失败: {:?}", path))?;
    tracing::info!("共加载 {} 条铭文", inscriptions.len());
    Ok(inscriptions)
}

/// 解析 JSON 数组或 JSON Lines
pub fn parse_inscriptions(content: &str) -> Result<Vec<Inscription>> {
    let trimmed = content.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let rows: Vec<Value> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed)?
    } else {
        trimmed
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line).with_context(|| format!("第 {} 行不是合法 JSON", n + 1))
            })
            .collect::<Result<_>>()?
    };

    let mut seen = HashSet::new();
    rows.into_iter()
        .enumerate()
        .map(|(index, row)| match row {
            Value::Object(map) => {
                let inscription = row_to_inscription(index, map);
                if !seen.insert(inscription.id.clone()) {
                    tracing::warn!("重复的铭文 id: {}", inscription.id);
                }
                Ok(inscription)
            }
            other => anyhow::bail!("第 {} 条记录不是对象: {}", index + 1, other),
        })
        .collect()
}

fn row_to_inscription(index: usize, mut map: Map<String, Value>) -> Inscription {
    let id = take_text(&mut map, ID_KEYS).unwrap_or_else(|| format!("row-{}", index));
    let raw_content = take_text(&mut map, CONTENT_KEYS);
    let source_translation = take_text(&mut map, TRANSLATION_KEYS);
    let language_hint = take_text(&mut map, LANGUAGE_KEYS);

    Inscription {
        id,
        raw_content,
        source_translation,
        language_hint,
        metadata: map,
    }
}

/// 取出第一个非空的候选列，其余同义列留在元数据中
fn take_text(map: &mut Map<String, Value>, keys: &[&str]) -> Option<String> {
    let key = keys.iter().find(|k| map.get(**k).map_or(false, has_text))?;
    map.remove(*key).and_then(value_to_text)
}

/// null 与空白字符串都视为缺失
fn has_text(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// 读取外部译文：`{ "id": "translation" }`
pub fn load_translations(path: &Path) -> Result<HashMap<String, String>> {
    tracing::info!("加载外部译文: {:?}", path);
    let content = std::fs::read_to_string(path).with_context(|| format!("读取译文文件失败: {:?}", path))?;
    let map: Map<String, Value> =
        serde_json::from_str(content.trim_start_matches('\u{feff}')).with_context(|| format!("解析译文文件失败: {:?}", path))?;

    let translations: HashMap<String, String> = map
        .into_iter()
        .filter_map(|(id, value)| value_to_text(value).map(|text| (id, text)))
        .collect();
    tracing::info!("共加载 {} 条外部译文", translations.len());
    Ok(translations)
}

/// 原子写入：先写临时文件，再替换
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = std::path::PathBuf::from(temp_name);

    std::fs::write(&temp_path, content).map_err(|e| {
        tracing::error!("写入临时文件失败: {}", e);
        e
    })?;

    if let Err(e) = std::fs::rename(&temp_path, path) {
        tracing::error!("重命名临时文件失败: {}", e);
        let _ = std::fs::remove_file(&temp_path);
        return Err(e.into());
    }
    Ok(())
}

/// 写出 JSON 报告
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    write_atomic(path, &content)?;
    tracing::info!("报告已写入: {:?}", path);
    Ok(())
}

/// 写出建模文本（仅 include_in_model 的记录，每行一条）
pub fn write_model_texts(path: &Path, records: &[CorpusRecord]) -> Result<usize> {
    let lines: Vec<&str> = records
        .iter()
        .filter(|r| r.include_in_model)
        .map(|r| r.final_text.as_str())
        .collect();

    let mut content = lines.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    write_atomic(path, &content)?;
    tracing::info!("建模文本已写入: {:?} ({} 行)", path, lines.len());
    Ok(lines.len())
}
