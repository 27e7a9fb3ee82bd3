//! Qiming 命令行入口
//!
//! 用法：`qiming <姓氏> <boy|girl> <YYYY-MM-DD> [HH:mm] [城市] [风格]`
//!
//! 创建会话 → 八字分析 → 按指定风格（缺省取第一个推荐风格）生成名字，结果以 JSON 输出到 stdout。

use std::sync::Arc;

use anyhow::{bail, Context};
use serde_json::json;

use qiming::{
    config::load_config,
    core::Orchestrator,
    domain::{BirthInput, CalendarType, Gender, Session},
    llm::create_llm_from_config,
    observability,
    session::SessionService,
    storage::JsonFileStore,
};

const USAGE: &str = "用法: qiming <姓氏> <boy|girl> <YYYY-MM-DD> [HH:mm] [城市] [风格]";

/// 兜底风格（模型未给出推荐风格时）
const FALLBACK_STYLE: &str = "诗词雅韵";

fn parse_args(args: &[String]) -> anyhow::Result<(BirthInput, Option<String>)> {
    if args.len() < 3 {
        bail!("{USAGE}");
    }
    let gender = match args[1].to_lowercase().as_str() {
        "boy" | "男" => Gender::Boy,
        "girl" | "女" => Gender::Girl,
        other => bail!("无法识别的性别: {other}\n{USAGE}"),
    };

    let info = BirthInput {
        last_name: args[0].clone(),
        gender,
        birth_date: args[2].clone(),
        birth_time: args.get(3).cloned().unwrap_or_default(),
        birth_city: args.get(4).cloned().unwrap_or_default(),
        calendar_type: CalendarType::Solar,
        is_leap_month: None,
        name_length: None,
    };
    let style = args.get(5).cloned().filter(|s| !s.trim().is_empty());
    Ok((info, style))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (info, style) = parse_args(&args)?;

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        Default::default()
    });

    std::fs::create_dir_all(&cfg.app.data_dir)
        .with_context(|| format!("Failed to create data dir {}", cfg.app.data_dir.display()))?;
    let store = JsonFileStore::<Session>::new(&cfg.app.data_dir, "sessions");
    let sessions = SessionService::new(Arc::new(store));

    let llm = create_llm_from_config(&cfg.llm);
    let orchestrator = Orchestrator::from_config(&cfg, llm.clone(), sessions.clone());

    let session = sessions
        .create(info)
        .await
        .context("Invalid birth information")?;

    let analysis = orchestrator
        .produce_bazi_analysis(&session.id)
        .await
        .context("Bazi analysis failed")?;

    let style = style
        .or_else(|| analysis.suggested_styles().first().map(|s| s.id.clone()))
        .unwrap_or_else(|| FALLBACK_STYLE.to_string());
    sessions.set_style_preference(&session.id, &style).await?;

    let names = orchestrator
        .produce_name_batch(&session.id, &style)
        .await
        .context("Name generation failed")?;

    let (prompt_tokens, completion_tokens, total_tokens) = llm.token_usage();
    tracing::info!(prompt_tokens, completion_tokens, total_tokens, "Token usage");

    let output = json!({
        "sessionId": session.id,
        "style": style,
        "baziAnalysis": analysis,
        "names": names,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_full_args() {
        let (info, style) =
            parse_args(&args(&["王", "boy", "2024-05-20", "08:00", "上海", "山河气象"])).unwrap();
        assert_eq!(info.last_name, "王");
        assert_eq!(info.gender, Gender::Boy);
        assert_eq!(info.birth_time, "08:00");
        assert_eq!(info.birth_city, "上海");
        assert_eq!(style.as_deref(), Some("山河气象"));
    }

    #[test]
    fn test_parse_minimal_args() {
        let (info, style) = parse_args(&args(&["李", "girl", "2023-11-02"])).unwrap();
        assert!(info.birth_time.is_empty());
        assert!(style.is_none());
    }

    #[test]
    fn test_parse_rejects_bad_gender_and_missing_args() {
        assert!(parse_args(&args(&["李", "cat", "2023-11-02"])).is_err());
        assert!(parse_args(&args(&["李"])).is_err());
    }
}
