// 命令行入口

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use graffiti_prep_lib::config::AppConfig;
use graffiti_prep_lib::RunOptions;

#[derive(Parser, Debug)]
#[command(name = "graffiti-prep", version, about = "铭文转写规范化、缺失补全与语料构建")]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 处理铭文语料
    Run {
        /// 输入文件（JSON 数组或 JSON Lines）
        #[arg(long)]
        input: PathBuf,
        /// 外部译文（JSON 对象 id → 译文）
        #[arg(long)]
        translations: Option<PathBuf>,
        /// 配置文件，缺省为用户配置目录下的 config.json
        #[arg(long)]
        config: Option<PathBuf>,
        /// JSON 报告输出路径
        #[arg(long)]
        output: Option<PathBuf>,
        /// 建模文本输出路径（每行一条）
        #[arg(long)]
        model_texts: Option<PathBuf>,
        /// 覆盖并发记录数
        #[arg(long)]
        workers: Option<usize>,
        /// 关闭缺失片段补全
        #[arg(long, default_value_t = false)]
        no_infill: bool,
    },
    /// 写出默认配置
    InitConfig {
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// 校验配置
    CheckConfig {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Run {
            input,
            translations,
            config,
            output,
            model_texts,
            workers,
            no_infill,
        } => {
            let mut app_config = load_config(config.as_ref())?;
            if let Some(workers) = workers {
                app_config.batch.workers = workers;
            }
            if no_infill {
                app_config.infill.enabled = false;
            }

            let options = RunOptions {
                input,
                translations,
                output,
                model_texts,
            };
            let summary = graffiti_prep_lib::run(app_config, &options).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::InitConfig { path } => {
            let config = AppConfig::new();
            match path {
                Some(path) => config.save_to(&path)?,
                None => config.save()?,
            }
        }
        Commands::CheckConfig { config } => {
            let app_config = load_config(config.as_ref())?;
            app_config.validate()?;
            println!("配置有效");
        }
    }

    Ok(())
}
