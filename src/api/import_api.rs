// ==========================================
// 报价批量导入API
// ==========================================
// 职责: 封装批量导入与导入模板导出
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::db::open_and_init;
use crate::domain::import::ImportReport;
use crate::importer::{ImportOrchestrator, QuoteImporter, TemplateExporter, TemplateFormat};
use crate::repository::{CustomerRepositoryImpl, QuoteRepositoryImpl};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

/// SQLite 装配的导入编排器
pub type SqliteImportOrchestrator =
    ImportOrchestrator<CustomerRepositoryImpl, QuoteRepositoryImpl, ConfigManager>;

/// 导入API
pub struct ImportApi {
    db_path: String,
}

impl ImportApi {
    /// 创建新的ImportApi实例
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    /// 创建导入器（客户/报价/配置共享同一连接）
    ///
    /// 调用方可在导入前通过 `subscribe_progress` 订阅进度
    pub fn create_importer(&self) -> ApiResult<SqliteImportOrchestrator> {
        let conn = open_and_init(&self.db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;
        let conn: Arc<Mutex<Connection>> = Arc::new(Mutex::new(conn));

        Ok(ImportOrchestrator::new(
            CustomerRepositoryImpl::from_connection(conn.clone()),
            QuoteRepositoryImpl::from_connection(conn.clone()),
            ConfigManager::from_connection(conn)?,
        ))
    }

    /// 导入报价文件
    ///
    /// # 返回
    /// - Ok(ImportReport): 导入报告（含部分失败明细）
    /// - Err(ApiError): 数据库不可用或配置读取失败
    pub async fn import_quotes(&self, file_path: &str) -> ApiResult<ImportReport> {
        let importer = self.create_importer()?;
        let report = importer.import_file(file_path).await?;

        info!(
            file_path = %file_path,
            batch_id = %report.batch_id,
            success = report.success_count,
            errors = report.errors.len(),
            "报价导入结束"
        );
        Ok(report)
    }

    /// 导入上传的表格内容
    pub async fn import_quote_bytes(
        &self,
        bytes: &[u8],
        file_name: Option<&str>,
    ) -> ApiResult<ImportReport> {
        let importer = self.create_importer()?;
        Ok(importer.import_bytes(bytes, file_name).await?)
    }

    /// 生成导入模板内容
    pub fn template_bytes(&self, format: TemplateFormat) -> ApiResult<Vec<u8>> {
        Ok(TemplateExporter::render(format)?)
    }

    /// 导出导入模板（.csv / .xlsx）
    pub fn export_template<P: AsRef<Path>>(&self, output_path: P) -> ApiResult<TemplateFormat> {
        Ok(TemplateExporter::export_to(output_path)?)
    }
}
