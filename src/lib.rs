// 铭文语料预处理
//
// 加载 → 语言路由 → 15 条规则规范化（含缺失片段补全）→ 译文合并与屏蔽 → 审计报告

pub mod config;
pub mod corpus;
pub mod infill;
pub mod language;
pub mod normalize;
pub mod pipeline;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

use config::AppConfig;
use corpus::{loader, CorpusBuilder, Inscription, NormalizedRecord};
use infill::SpanInfiller;
use language::LanguageRouter;
use normalize::NormalizationEngine;
use pipeline::{AuditSummary, BatchPipeline, RecordOutcome, RunReport, SkippedRecord};

/// 一次运行的输入输出位置
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub input: PathBuf,
    pub translations: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub model_texts: Option<PathBuf>,
}

/// 按配置组装批处理管道
pub fn build_pipeline(config: &AppConfig, infiller: SpanInfiller) -> Result<BatchPipeline> {
    let router = LanguageRouter::new(config.normalization.mixed_script_ratio);
    let engine = NormalizationEngine::new(&config.normalization)?.with_infiller(Arc::new(infiller));
    Ok(BatchPipeline::new(router, engine, config.batch.workers))
}

/// 处理已加载的铭文，生成报告（不读写文件）
pub async fn process_corpus(
    config: &AppConfig,
    infiller: SpanInfiller,
    inscriptions: Vec<Inscription>,
    translations: &HashMap<String, String>,
) -> Result<RunReport> {
    config.validate()?;
    let start = Instant::now();
    let run_id = uuid::Uuid::new_v4().to_string();
    tracing::info!("运行开始: run_id={}", run_id);

    let builder = CorpusBuilder::new(&config.denylist)?;
    let pipeline = build_pipeline(config, infiller)?;
    let outcomes = pipeline.run(inscriptions).await;

    let (normalized, skipped) = split_outcomes(&outcomes);
    let records = builder.build(&normalized, translations);

    let summary = AuditSummary::from_run(run_id, &outcomes, &records, start.elapsed().as_millis() as u64);
    log_summary(&summary);

    Ok(RunReport {
        summary,
        records,
        skipped,
    })
}

fn split_outcomes(outcomes: &[RecordOutcome]) -> (Vec<NormalizedRecord>, Vec<SkippedRecord>) {
    let mut normalized = Vec::new();
    let mut skipped = Vec::new();

    for outcome in outcomes {
        if outcome.is_normalized() {
            if let Some(record) = outcome.clone().into_normalized() {
                normalized.push(record);
            }
        } else {
            skipped.push(SkippedRecord {
                index: outcome.index,
                id: outcome.id.clone(),
                language: outcome.language,
                status: outcome.status.clone(),
            });
        }
    }

    (normalized, skipped)
}

fn log_summary(summary: &AuditSummary) {
    tracing::info!(
        "审计汇总: run_id={}, 输入 {}, 规范化 {}, 空内容 {}, 跳过标记 {}, 失败 {}",
        summary.run_id,
        summary.total,
        summary.processed,
        summary.skipped_empty,
        summary.skipped_marker,
        summary.failed
    );
    tracing::info!(
        "补全: 成功 {}, 未补全 {}; 建模 {}, 屏蔽 {}; 耗时 {}ms",
        summary.resolved_infill,
        summary.unresolved_infill,
        summary.included_in_model,
        summary.excluded_by_denylist,
        summary.elapsed_ms
    );
    if !summary.is_reconciled() {
        tracing::warn!("审计计数不一致: {:?}", summary);
    }
}

/// 完整运行：读取输入，处理，写出报告
///
/// 配置错误在读取任何输入之前报告
pub async fn run(config: AppConfig, options: &RunOptions) -> Result<AuditSummary> {
    config.validate()?;

    let inscriptions = loader::load_inscriptions(&options.input)?;
    let translations = match &options.translations {
        Some(path) => loader::load_translations(path)?,
        None => HashMap::new(),
    };

    let infiller = SpanInfiller::from_config(&config.infill);
    let report = process_corpus(&config, infiller, inscriptions, &translations).await?;

    if let Some(path) = &options.output {
        loader::write_json(path, &report)?;
    }
    if let Some(path) = &options.model_texts {
        loader::write_model_texts(path, &report.records)?;
    }

    Ok(report.summary)
}
