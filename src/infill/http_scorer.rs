// 远程掩码语言模型打分客户端
//
// 兼容两种响应格式：
// - `{"candidates": [{"token": "...", "score": 0.5}]}`
// - HuggingFace fill-mask：`[{"token_str": "...", "score": 0.5}]`（批量时为嵌套数组）

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::config::ScorerEndpointConfig;
use crate::infill::scorer::{MaskScorer, ScoreRequest, ScoreResponse, ScoredToken};
use crate::normalize::sentinel::MASK;

/// HTTP 打分服务客户端
#[derive(Clone)]
pub struct HttpMaskScorer {
    name: String,
    config: ScorerEndpointConfig,
    client: Client,
}

impl HttpMaskScorer {
    pub fn new(name: impl Into<String>, config: ScorerEndpointConfig) -> Self {
        // 单次调用超时由补全器控制，这里只设连接层上限
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(5))
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .no_proxy()
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            name: name.into(),
            config,
            client,
        }
    }

    fn request_body(&self, request: &ScoreRequest) -> Value {
        let context = if self.config.mask_token == MASK {
            request.context.clone()
        } else {
            request.context.replace(MASK, &self.config.mask_token)
        };

        serde_json::json!({
            "model": self.config.model,
            "context": context,
            "mask_position": request.mask_position,
            "language": request.language.as_str(),
            "top_k": request.top_k,
            "inputs": context,
            "parameters": { "top_k": request.top_k }
        })
    }
}

#[async_trait]
impl MaskScorer for HttpMaskScorer {
    async fn score(&self, request: ScoreRequest) -> Result<ScoreResponse> {
        let body = self.request_body(&request);

        tracing::debug!(
            "打分请求: scorer={}, endpoint={}, language={}, context_len={}",
            self.name,
            self.config.endpoint,
            request.language,
            request.context.chars().count()
        );

        let mut builder = self
            .client
            .post(&self.config.endpoint)
            .header("Content-Type", "application/json");
        if !self.config.api_key.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {}", self.config.api_key));
        }

        let response = builder.json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("打分服务请求失败 ({}): {}", status, text);
        }

        let payload: Value = response.json().await?;
        parse_score_response(&payload)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// 解析打分服务响应
pub fn parse_score_response(payload: &Value) -> Result<ScoreResponse> {
    let entries = match payload {
        Value::Object(map) => map
            .get("candidates")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow::anyhow!("响应缺少 candidates 字段: {}", payload))?,
        Value::Array(items) => match items.first() {
            // 批量输入时 HF 返回 [[...]]，只取第一个掩码
            Some(Value::Array(inner)) => inner,
            _ => items,
        },
        _ => anyhow::bail!("打分服务返回格式不可解析: {}", payload),
    };

    let candidates = entries
        .iter()
        .filter_map(|entry| {
            let token = entry
                .get("token")
                .and_then(Value::as_str)
                .or_else(|| entry.get("token_str").and_then(Value::as_str))?;
            let score = entry.get("score").and_then(Value::as_f64)?;
            Some(ScoredToken::new(token, score as f32))
        })
        .collect();

    Ok(ScoreResponse { candidates })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;

    fn endpoint(mask_token: &str) -> ScorerEndpointConfig {
        ScorerEndpointConfig {
            endpoint: "http://127.0.0.1:9/score".to_string(),
            api_key: String::new(),
            model: "latin-bert".to_string(),
            mask_token: mask_token.to_string(),
        }
    }

    #[test]
    fn test_parse_candidates_format() {
        let payload = serde_json::json!({
            "candidates": [
                {"token": "et", "score": 0.7},
                {"token": "in", "score": 0.2}
            ]
        });
        let response = parse_score_response(&payload).unwrap();
        assert_eq!(response.candidates.len(), 2);
        assert_eq!(response.candidates[0], ScoredToken::new("et", 0.7));
    }

    #[test]
    fn test_parse_fill_mask_format() {
        let payload = serde_json::json!([
            {"token_str": "καὶ", "score": 0.4, "token": 1234},
            {"token_str": "τοῦ", "score": 0.1, "token": 99}
        ]);
        let response = parse_score_response(&payload).unwrap();
        assert_eq!(response.candidates[0].token, "καὶ");

        let nested = serde_json::json!([[{"token_str": "et", "score": 0.9}]]);
        let response = parse_score_response(&nested).unwrap();
        assert_eq!(response.candidates, vec![ScoredToken::new("et", 0.9)]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_score_response(&serde_json::json!("oops")).is_err());
        assert!(parse_score_response(&serde_json::json!({"choices": []})).is_err());
    }

    #[test]
    fn test_request_body_rewrites_mask_token() {
        let scorer = HttpMaskScorer::new("latin", endpoint("<mask>"));
        let request = ScoreRequest {
            context: "salve [MASK] amice".to_string(),
            mask_position: 6,
            language: Language::Latin,
            top_k: 3,
        };
        let body = scorer.request_body(&request);
        assert_eq!(body["context"], "salve <mask> amice");
        assert_eq!(body["parameters"]["top_k"], 3);
        assert_eq!(body["language"], "latin");
    }
}
