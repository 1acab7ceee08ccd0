// 打分服务测试工具 - 独立验证掩码语言模型端点
use anyhow::Result;

use graffiti_prep_lib::config::{AppConfig, ScorerEndpointConfig};
use graffiti_prep_lib::infill::{select_candidate, HttpMaskScorer, MaskScorer, ScoreRequest};
use graffiti_prep_lib::language::Language;
use graffiti_prep_lib::normalize::alphabet::AlphabetSet;
use graffiti_prep_lib::normalize::MASK;

fn read_line(prompt: &str) -> Result<String> {
    println!("{}", prompt);
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt::init();

    println!("=== 掩码打分服务测试工具 ===\n");

    // 1. 选择语言
    let language = match read_line("请输入语言 (latin / greek):")?.as_str() {
        "greek" | "grc" => Language::Greek,
        _ => Language::Latin,
    };
    println!("✓ 语言: {}\n", language);

    // 2. 端点：优先使用配置文件，其次环境变量
    let config = AppConfig::load()?;
    let configured = match language {
        Language::Greek => config.infill.greek.clone(),
        _ => config.infill.latin.clone(),
    };
    let endpoint = match configured {
        Some(endpoint) => endpoint,
        None => {
            let url = std::env::var("SCORER_ENDPOINT").or_else(|_| read_line("请输入打分服务地址:"))?;
            if url.is_empty() {
                anyhow::bail!("打分服务地址不能为空");
            }
            ScorerEndpointConfig {
                endpoint: url,
                api_key: std::env::var("SCORER_API_KEY").unwrap_or_default(),
                model: String::new(),
                mask_token: MASK.to_string(),
            }
        }
    };
    println!("✓ 端点: {}\n", endpoint.endpoint);

    // 3. 构建请求
    let context = read_line(&format!("请输入含一个 {} 的上下文:", MASK))?;
    let mask_position = match context.find(MASK) {
        Some(byte_pos) => context[..byte_pos].chars().count(),
        None => anyhow::bail!("上下文中没有 {}", MASK),
    };

    let request = ScoreRequest {
        context,
        mask_position,
        language,
        top_k: config.infill.top_k,
    };

    // 4. 发送请求
    println!("正在发送请求...");
    let scorer = HttpMaskScorer::new(language.as_str(), endpoint);
    let response = scorer.score(request).await?;

    println!("=== 候选列表 ===");
    for candidate in &response.candidates {
        println!("{:>8.4}  {}", candidate.score, candidate.token);
    }

    // 5. 按补全规则选出结果（候选须通过该语言的白名单）
    let alphabets = AlphabetSet::from_config(&config.normalization.allow_lists)?;
    match select_candidate(&response.candidates, alphabets.for_language(language)) {
        Some(candidate) => println!("\n✅ 选中: {} (置信度 {:?})", candidate.token, candidate.confidence),
        None => println!("\n❌ 没有可用候选"),
    }

    Ok(())
}
