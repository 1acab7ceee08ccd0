// 批处理管道
//
// 每条铭文：语言路由 → 规范化（含补全）→ RecordOutcome
// 记录之间互不影响，结果携带输入序号，结束后按序号恢复顺序

use std::sync::Arc;
use std::time::Instant;

use futures_util::stream::{self, StreamExt};
use serde_json::Map;

use crate::corpus::Inscription;
use crate::language::{Language, LanguageRouter, LanguageSource};
use crate::normalize::NormalizationEngine;
use crate::pipeline::types::{RecordOutcome, RecordStatus};

/// 批处理管道（共享只读的路由器与引擎）
#[derive(Clone)]
pub struct BatchPipeline {
    router: Arc<LanguageRouter>,
    engine: Arc<NormalizationEngine>,
    workers: usize,
}

impl BatchPipeline {
    pub fn new(router: LanguageRouter, engine: NormalizationEngine, workers: usize) -> Self {
        Self {
            router: Arc::new(router),
            engine: Arc::new(engine),
            workers: workers.max(1),
        }
    }

    /// 处理全部记录，返回值已按输入顺序排列
    pub async fn run(&self, inscriptions: Vec<Inscription>) -> Vec<RecordOutcome> {
        let total = inscriptions.len();
        let start = Instant::now();
        tracing::info!("开始规范化: {} 条记录, 并发 {}", total, self.workers);

        let mut outcomes: Vec<RecordOutcome> = stream::iter(inscriptions.into_iter().enumerate())
            .map(|(index, inscription)| {
                let router = Arc::clone(&self.router);
                let engine = Arc::clone(&self.engine);
                let id = inscription.id.clone();

                async move {
                    // 单独的任务：某条记录 panic 只影响它自己
                    let handle = tokio::spawn(async move {
                        process_record(&router, &engine, index, inscription).await
                    });
                    match handle.await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            tracing::error!("记录 {} 处理任务异常: {}", id, e);
                            RecordOutcome {
                                index,
                                id,
                                language: Language::Unknown,
                                language_source: LanguageSource::Fallback,
                                source_translation: None,
                                metadata: Map::new(),
                                status: RecordStatus::Failed {
                                    reason: e.to_string(),
                                },
                            }
                        }
                    }
                }
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        restore_input_order(&mut outcomes);

        tracing::info!(
            "规范化完成: {} 条记录, 耗时 {}ms",
            outcomes.len(),
            start.elapsed().as_millis()
        );
        outcomes
    }
}

/// 处理单条记录（从不失败，排除原因写入状态）
pub async fn process_record(
    router: &LanguageRouter,
    engine: &NormalizationEngine,
    index: usize,
    inscription: Inscription,
) -> RecordOutcome {
    let (language, language_source) = router.classify_with_source(&inscription);
    let raw = inscription.raw_content.as_deref().unwrap_or("");

    let status = match engine.normalize(raw, language).await {
        Ok(result) => RecordStatus::Normalized { result },
        Err(reason) => {
            tracing::debug!("记录 {} 被排除: {}", inscription.id, reason);
            RecordStatus::Skipped { reason }
        }
    };

    RecordOutcome {
        index,
        id: inscription.id,
        language,
        language_source,
        source_translation: inscription.source_translation,
        metadata: inscription.metadata,
        status,
    }
}

/// 按输入序号恢复顺序（序号唯一，排序结果确定）
pub fn restore_input_order(outcomes: &mut [RecordOutcome]) {
    outcomes.sort_by_key(|o| o.index);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NormalizationConfig;
    use crate::normalize::SkipReason;

    fn inscription(id: &str, content: Option<&str>) -> Inscription {
        Inscription {
            id: id.to_string(),
            raw_content: content.map(str::to_string),
            language_hint: Some("Latin".to_string()),
            ..Default::default()
        }
    }

    fn pipeline(workers: usize) -> BatchPipeline {
        let engine = NormalizationEngine::new(&NormalizationConfig::default()).unwrap();
        BatchPipeline::new(LanguageRouter::default(), engine, workers)
    }

    #[tokio::test]
    async fn test_run_keeps_input_order() {
        let inscriptions: Vec<Inscription> = (0..50)
            .map(|i| inscription(&format!("r{}", i), Some("Salve")))
            .collect();
        let outcomes = pipeline(8).run(inscriptions).await;

        assert_eq!(outcomes.len(), 50);
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.index, i);
            assert_eq!(outcome.id, format!("r{}", i));
            assert!(outcome.is_normalized());
        }
    }

    #[tokio::test]
    async fn test_exclusions_do_not_stop_batch() {
        let outcomes = pipeline(2)
            .run(vec![
                inscription("a", None),
                inscription("b", Some("ABC")),
                inscription("c", Some("Vale")),
            ])
            .await;

        assert_eq!(
            outcomes[0].status,
            RecordStatus::Skipped {
                reason: SkipReason::EmptyContent
            }
        );
        assert_eq!(
            outcomes[1].status,
            RecordStatus::Skipped {
                reason: SkipReason::SkipMarker
            }
        );
        assert!(outcomes[2].is_normalized());
        assert_eq!(outcomes[2].language, Language::Latin);
    }

    #[test]
    fn test_restore_input_order() {
        let mut outcomes: Vec<RecordOutcome> = [3usize, 0, 2, 1]
            .iter()
            .map(|&index| RecordOutcome {
                index,
                id: index.to_string(),
                language: Language::Latin,
                language_source: LanguageSource::Metadata,
                source_translation: None,
                metadata: Map::new(),
                status: RecordStatus::Failed {
                    reason: String::new(),
                },
            })
            .collect();
        restore_input_order(&mut outcomes);
        let ids: Vec<&str> = outcomes.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "2", "3"]);
    }
}
