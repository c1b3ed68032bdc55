// ==========================================
// 加工安装报价系统 - 报价导入 Trait
// ==========================================
// 职责: 定义批量报价导入接口（不包含实现）
// ==========================================

use crate::domain::import::ImportReport;
use crate::importer::error::ImportResult;
use async_trait::async_trait;
use std::path::Path;

// ==========================================
// QuoteImporter Trait
// ==========================================
// 用途: 批量报价导入主接口
// 实现者: ImportOrchestrator
#[async_trait]
pub trait QuoteImporter: Send + Sync {
    /// 从表格字节流导入报价
    ///
    /// # 参数
    /// - bytes: 表格文件内容（.xlsx / .xls / .csv）
    /// - file_name: 原始文件名（格式提示，可为空）
    ///
    /// # 返回
    /// - Ok(ImportReport): 导入报告（解析失败/空文件/校验失败也以报告形式返回）
    /// - Err: 配置读取失败
    ///
    /// # 导入流程
    /// 1. Parsing: 字节流 → 原始行
    /// 2. Validating: 全部行校验，任一错误则整批零落库
    /// 3. Grouping: 按 TRIM 后电话保序分组
    /// 4. Reconciling: 客户 lookup-or-create + 计价汇总 + 报价编号
    /// 5. Persisting: 有界队列单消费者顺序落库，失败记录后继续
    /// 6. Reporting: 汇总成功数与错误列表
    async fn import_bytes(&self, bytes: &[u8], file_name: Option<&str>)
        -> ImportResult<ImportReport>;

    /// 从磁盘文件导入报价
    ///
    /// # 说明
    /// - 文件不存在/不可读同样以 ParseFailed 报告返回
    async fn import_file<P: AsRef<Path> + Send>(&self, file_path: P) -> ImportResult<ImportReport>;
}
