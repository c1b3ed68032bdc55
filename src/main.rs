// ==========================================
// 加工安装报价系统 - 命令行入口
// ==========================================
// 用法:
//   quote-engine import <file> [db_path]   批量导入报价（.xlsx/.xls/.csv）
//   quote-engine template <output>         导出导入模板（.csv/.xlsx）
//   quote-engine order-number [db_path]    生成订单编号
// ==========================================

use anyhow::{bail, Context, Result};
use quote_engine::api::{ImportApi, SqliteQuoteApi};
use quote_engine::db::get_default_db_path;
use quote_engine::domain::ImportStatus;
use quote_engine::importer::TemplateExporter;
use quote_engine::logging;
use std::process::ExitCode;

const USAGE: &str = "用法:
  quote-engine import <file> [db_path]
  quote-engine template <output.csv|output.xlsx>
  quote-engine order-number [db_path]";

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_default();

    let result = match command.as_str() {
        "import" => match args.next() {
            Some(file) => run_import(&file, args.next()).await,
            None => usage(),
        },
        "template" => match args.next() {
            Some(output) => run_template(&output),
            None => usage(),
        },
        "order-number" => run_order_number(args.next()).await,
        _ => usage(),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "命令执行失败");
            eprintln!("{:#}", err);
            ExitCode::from(2)
        }
    }
}

fn usage() -> Result<ExitCode> {
    bail!(USAGE)
}

fn resolve_db_path(arg: Option<String>) -> String {
    arg.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(get_default_db_path)
}

async fn run_import(file: &str, db_path: Option<String>) -> Result<ExitCode> {
    let db_path = resolve_db_path(db_path);
    tracing::info!("{} v{} - 使用数据库: {}", quote_engine::APP_NAME, quote_engine::VERSION, db_path);

    let api = ImportApi::new(db_path);
    let report = api
        .import_quotes(file)
        .await
        .with_context(|| format!("导入失败: {}", file))?;

    let json = serde_json::to_string_pretty(&report).context("导入报告序列化失败")?;
    println!("{}", json);

    let clean = report.status == ImportStatus::Completed && report.errors.is_empty();
    Ok(if clean {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_template(output: &str) -> Result<ExitCode> {
    let format = TemplateExporter::export_to(output)
        .with_context(|| format!("模板导出失败: {}", output))?;
    println!("template={} format={:?}", output, format);
    Ok(ExitCode::SUCCESS)
}

async fn run_order_number(db_path: Option<String>) -> Result<ExitCode> {
    let db_path = resolve_db_path(db_path);
    let api = SqliteQuoteApi::open(&db_path)
        .with_context(|| format!("无法打开数据库: {}", db_path))?;
    let number = api.next_order_number().await.context("订单编号生成失败")?;
    println!("{}", number);
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_template_unsupported_extension_carries_context() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("template.pdf");
        let output = output.to_str().unwrap();

        let err = run_template(output).unwrap_err();
        assert!(err.to_string().contains("模板导出失败"));
        assert!(err.chain().count() >= 2);
        assert!(!std::path::Path::new(output).exists());
    }

    #[test]
    fn test_template_writes_csv() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("template.csv");

        run_template(output.to_str().unwrap()).unwrap();
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_order_number_uses_given_db() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("cli.db");

        run_order_number(Some(db_path.to_string_lossy().to_string()))
            .await
            .unwrap();
        assert!(db_path.exists());
    }

    #[test]
    fn test_usage_is_an_error() {
        let err = usage().unwrap_err();
        assert!(err.to_string().contains("quote-engine import"));
    }
}
