// ==========================================
// 加工安装报价系统 - 批量报价导入编排器
// ==========================================
// 职责: 整合导入流程，从表格字节流到报价落库
// 状态机:
//   Idle → Parsing → Validating → Reporting（任一校验错误，零落库）
//   Validating → Grouping → Reconciling → Persisting → Reporting → Idle
// 落库: 有界队列 + 单消费者，一次只有一个写入在途；失败记录后继续
// ==========================================

use crate::config::{QuoteConfigReader, QuoteSettings};
use crate::domain::import::{
    ImportFailure, ImportProgress, ImportReport, ImportStatus, QuoteGroup, QuoteRow,
};
use crate::domain::quote::{DiscountPolicy, Quote, QuoteDraft, QuoteItem};
use crate::domain::types::QuoteStatus;
use crate::engine::aggregator::QuoteAggregator;
use crate::engine::draft::recompute_with;
use crate::engine::identifier::{IdentifierGenerator, UncheckedRandomId};
use crate::importer::customer_reconciler::{group_rows, CustomerReconciler};
use crate::importer::error::ImportResult;
use crate::importer::file_parser::{RowSource, SourceRow, UniversalFileParser};
use crate::importer::quote_importer_trait::QuoteImporter;
use crate::importer::row_validator::{QuoteRowValidator, RowValidator};
use crate::repository::{CustomerRepository, QuoteRepository};
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use indexmap::IndexMap;
use std::path::Path;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// 落库队列默认容量
pub const DEFAULT_PERSIST_QUEUE_CAPACITY: usize = 16;

// ==========================================
// PendingQuote - 待落库报价
// ==========================================
#[derive(Debug, Clone)]
pub struct PendingQuote {
    pub group: usize, // 分组序号（从 1 开始）
    pub phone: String,
    pub quote: Quote,
}

// ==========================================
// ImportState - 编排器状态
// ==========================================
// 每个状态携带进入该阶段所需的全部数据
#[derive(Debug)]
pub enum ImportState {
    Idle,
    Parsing,
    Validating(Vec<SourceRow>),
    Grouping(Vec<QuoteRow>),
    Reconciling(IndexMap<String, QuoteGroup>),
    Persisting(Vec<PendingQuote>),
    Reporting(ImportReport),
}

impl ImportState {
    pub fn name(&self) -> &'static str {
        match self {
            ImportState::Idle => "Idle",
            ImportState::Parsing => "Parsing",
            ImportState::Validating(_) => "Validating",
            ImportState::Grouping(_) => "Grouping",
            ImportState::Reconciling(_) => "Reconciling",
            ImportState::Persisting(_) => "Persisting",
            ImportState::Reporting(_) => "Reporting",
        }
    }
}

// ==========================================
// BatchContext - 单批次上下文
// ==========================================
// 错误列表与进度只归当前批次所有
pub struct BatchContext<'a> {
    bytes: &'a [u8],
    file_name: Option<&'a str>,
    batch_id: String,
    started: Instant,
    settings: QuoteSettings,
    today: NaiveDate,
    total_rows: usize,
    total_groups: usize,
    quote_numbers: Vec<String>,
    errors: Vec<ImportFailure>,
    progress: ImportProgress,
}

impl<'a> BatchContext<'a> {
    pub fn new(bytes: &'a [u8], file_name: Option<&'a str>, settings: QuoteSettings) -> Self {
        Self {
            bytes,
            file_name,
            batch_id: Uuid::new_v4().to_string(),
            started: Instant::now(),
            settings,
            today: Local::now().date_naive(),
            total_rows: 0,
            total_groups: 0,
            quote_numbers: Vec::new(),
            errors: Vec::new(),
            progress: ImportProgress::default(),
        }
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    pub fn errors(&self) -> &[ImportFailure] {
        &self.errors
    }

    /// 缺省有效期: 今天 + quote_validity_days
    fn default_valid_until(&self) -> NaiveDate {
        self.settings.valid_until_from(self.today)
    }

    fn report(&mut self, status: ImportStatus) -> ImportReport {
        ImportReport {
            batch_id: self.batch_id.clone(),
            status,
            total_rows: self.total_rows,
            total_groups: self.total_groups,
            success_count: self.progress.persisted,
            quote_numbers: std::mem::take(&mut self.quote_numbers),
            errors: std::mem::take(&mut self.errors),
            elapsed_ms: self.started.elapsed().as_millis() as u64,
        }
    }
}

// ==========================================
// ImportOrchestrator - 批量报价导入编排器
// ==========================================
pub struct ImportOrchestrator<C, Q, K>
where
    C: CustomerRepository,
    Q: QuoteRepository,
    K: QuoteConfigReader,
{
    // 数据访问层
    customer_repo: C,
    quote_repo: Q,

    // 配置读取器
    config: K,

    // 导入组件
    row_source: Box<dyn RowSource>,
    row_validator: Box<dyn RowValidator>,
    quote_numbers: Box<dyn IdentifierGenerator>,

    // 落库队列容量
    queue_capacity: usize,

    // 进度广播
    progress_tx: watch::Sender<ImportProgress>,
}

impl<C, Q, K> ImportOrchestrator<C, Q, K>
where
    C: CustomerRepository,
    Q: QuoteRepository,
    K: QuoteConfigReader,
{
    /// 创建编排器（默认组件: 通用文件解析器 / 报价行校验器 / 随机报价编号）
    pub fn new(customer_repo: C, quote_repo: Q, config: K) -> Self {
        let (progress_tx, _) = watch::channel(ImportProgress::default());
        Self {
            customer_repo,
            quote_repo,
            config,
            row_source: Box::new(UniversalFileParser),
            row_validator: Box::new(QuoteRowValidator::new()),
            quote_numbers: Box::new(UncheckedRandomId::quote_numbers()),
            queue_capacity: DEFAULT_PERSIST_QUEUE_CAPACITY,
            progress_tx,
        }
    }

    pub fn with_row_source(mut self, row_source: Box<dyn RowSource>) -> Self {
        self.row_source = row_source;
        self
    }

    pub fn with_row_validator(mut self, row_validator: Box<dyn RowValidator>) -> Self {
        self.row_validator = row_validator;
        self
    }

    pub fn with_identifier_generator(mut self, generator: Box<dyn IdentifierGenerator>) -> Self {
        self.quote_numbers = generator;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// 订阅落库进度（persisted / failed / total）
    pub fn subscribe_progress(&self) -> watch::Receiver<ImportProgress> {
        self.progress_tx.subscribe()
    }

    /// 推进一步状态机
    pub async fn advance(&self, state: ImportState, ctx: &mut BatchContext<'_>) -> ImportState {
        match state {
            ImportState::Idle => ImportState::Parsing,
            ImportState::Parsing => self.parse(ctx),
            ImportState::Validating(rows) => self.validate(rows, ctx),
            ImportState::Grouping(rows) => self.group(rows, ctx),
            ImportState::Reconciling(groups) => self.reconcile(groups, ctx).await,
            ImportState::Persisting(pending) => {
                self.persist(pending, ctx).await;
                ImportState::Reporting(ctx.report(ImportStatus::Completed))
            }
            ImportState::Reporting(_) => ImportState::Idle,
        }
    }

    /// 从 Idle 运行到 Reporting
    async fn run(&self, ctx: &mut BatchContext<'_>) -> ImportReport {
        self.publish(ImportProgress::default());

        let mut state = ImportState::Idle;
        loop {
            let next = self.advance(state, ctx).await;
            debug!(batch_id = %ctx.batch_id, state = next.name(), "状态迁移");
            match next {
                ImportState::Reporting(report) => {
                    info!(
                        batch_id = %report.batch_id,
                        status = ?report.status,
                        total_rows = report.total_rows,
                        total_groups = report.total_groups,
                        success = report.success_count,
                        errors = report.errors.len(),
                        elapsed_ms = report.elapsed_ms,
                        "导入完成"
                    );
                    return report;
                }
                other => state = other,
            }
        }
    }

    // === 阶段: Parsing ===
    fn parse(&self, ctx: &mut BatchContext<'_>) -> ImportState {
        match self.row_source.read_rows(ctx.bytes, ctx.file_name) {
            Ok(rows) if rows.is_empty() => {
                warn!(batch_id = %ctx.batch_id, "文件无数据行");
                ImportState::Reporting(ctx.report(ImportStatus::Empty))
            }
            Ok(rows) => {
                ctx.total_rows = rows.len();
                info!(total_rows = rows.len(), "文件解析完成");
                ImportState::Validating(rows)
            }
            Err(e) => {
                error!(error = %e, "文件解析失败");
                ctx.errors.push(ImportFailure::Parse {
                    message: e.to_string(),
                });
                ImportState::Reporting(ctx.report(ImportStatus::ParseFailed))
            }
        }
    }

    // === 阶段: Validating（全部行校验，不短路）===
    fn validate(&self, rows: Vec<SourceRow>, ctx: &mut BatchContext<'_>) -> ImportState {
        let mut valid_rows = Vec::with_capacity(rows.len());
        let mut failed_rows = 0usize;

        for row in &rows {
            match self.row_validator.parse_row(&row.values, row.row_number) {
                Ok(parsed) => valid_rows.push(parsed),
                Err(errors) => {
                    failed_rows += 1;
                    ctx.errors
                        .extend(errors.into_iter().map(ImportFailure::RowValidation));
                }
            }
        }

        if !ctx.errors.is_empty() {
            warn!(
                failed_rows = failed_rows,
                errors = ctx.errors.len(),
                "行校验失败，整批放弃落库"
            );
            return ImportState::Reporting(ctx.report(ImportStatus::ValidationFailed));
        }

        info!(valid_rows = valid_rows.len(), "行校验通过");
        ImportState::Grouping(valid_rows)
    }

    // === 阶段: Grouping ===
    fn group(&self, rows: Vec<QuoteRow>, ctx: &mut BatchContext<'_>) -> ImportState {
        let groups = group_rows(rows);
        ctx.total_groups = groups.len();
        ctx.progress.total = groups.len();
        self.publish(ctx.progress);

        info!(groups = groups.len(), "按电话分组完成");
        ImportState::Reconciling(groups)
    }

    // === 阶段: Reconciling（客户对账 + 计价 + 编号）===
    async fn reconcile(
        &self,
        groups: IndexMap<String, QuoteGroup>,
        ctx: &mut BatchContext<'_>,
    ) -> ImportState {
        let mut reconciler = CustomerReconciler::new(&self.customer_repo);
        let aggregator = QuoteAggregator::new(ctx.settings.vat_rate);
        let mut pending = Vec::with_capacity(groups.len());

        for (idx, group) in groups.values().enumerate() {
            let group_index = idx + 1;

            let customer = match reconciler.reconcile(group_index, group).await {
                Ok(customer) => customer,
                Err(failure) => {
                    ctx.errors.push(failure);
                    ctx.progress.failed += 1;
                    self.publish(ctx.progress);
                    continue;
                }
            };

            let draft = recompute_with(&self.draft_for_group(group, &ctx.settings), &aggregator);

            let quote_number = match self
                .quote_numbers
                .generate(&ctx.settings.quote_number_prefix, None)
                .await
            {
                Ok(number) => number,
                Err(e) => {
                    error!(group = group_index, error = %e, "报价编号生成失败");
                    ctx.errors.push(ImportFailure::Reconciliation {
                        group: group_index,
                        phone: group.phone.clone(),
                        message: format!("报价编号生成失败: {}", e),
                    });
                    ctx.progress.failed += 1;
                    self.publish(ctx.progress);
                    continue;
                }
            };

            let valid_until = group.valid_until.unwrap_or_else(|| ctx.default_valid_until());
            let quote = draft.to_quote(&customer.customer_id, &quote_number, valid_until);

            debug!(
                group = group_index,
                phone = %group.phone,
                items = quote.items.len(),
                total = quote.total,
                "报价已生成"
            );
            pending.push(PendingQuote {
                group: group_index,
                phone: group.phone.clone(),
                quote,
            });
        }

        info!(
            pending = pending.len(),
            customers_created = reconciler.created_count(),
            "客户对账完成"
        );
        ImportState::Persisting(pending)
    }

    fn draft_for_group(&self, group: &QuoteGroup, settings: &QuoteSettings) -> QuoteDraft {
        let mut draft = QuoteDraft::new(group.customer_name.clone(), group.phone.clone())
            .with_discount(DiscountPolicy::none())
            .with_shipping(0.0)
            .with_minimum_chargeable_area(settings.minimum_chargeable_area);
        draft.customer_email = group.customer_email.clone();
        draft.remarks = group.remarks.clone();
        draft.valid_until = group.valid_until;
        draft.status = QuoteStatus::Draft;

        group.rows.iter().fold(draft, |draft, row| {
            draft.with_item(QuoteItem::new(
                row.location.clone(),
                row.item_type.clone(),
                row.height,
                row.width,
                row.qty,
                row.unit_price,
            ))
        })
    }

    // === 阶段: Persisting（有界队列，单消费者）===
    async fn persist(&self, pending: Vec<PendingQuote>, ctx: &mut BatchContext<'_>) {
        let (tx, mut rx) = mpsc::channel::<PendingQuote>(self.queue_capacity);

        let producer = async move {
            for item in pending {
                if tx.send(item).await.is_err() {
                    break;
                }
            }
        };

        let worker = async {
            while let Some(item) = rx.recv().await {
                match self.quote_repo.insert(&item.quote).await {
                    Ok(()) => {
                        info!(
                            group = item.group,
                            quote_number = %item.quote.quote_number,
                            customer_id = %item.quote.customer_id,
                            "报价落库成功"
                        );
                        ctx.progress.persisted += 1;
                        ctx.quote_numbers.push(item.quote.quote_number);
                    }
                    Err(e) => {
                        error!(
                            group = item.group,
                            quote_number = %item.quote.quote_number,
                            error = %e,
                            "报价落库失败"
                        );
                        ctx.progress.failed += 1;
                        ctx.errors.push(ImportFailure::Persistence {
                            group: item.group,
                            phone: item.phone,
                            quote_number: item.quote.quote_number,
                            message: e.to_string(),
                        });
                    }
                }
                self.publish(ctx.progress);
            }
        };

        tokio::join!(producer, worker);
    }

    fn publish(&self, progress: ImportProgress) {
        self.progress_tx.send_replace(progress);
    }
}

#[async_trait]
impl<C, Q, K> QuoteImporter for ImportOrchestrator<C, Q, K>
where
    C: CustomerRepository,
    Q: QuoteRepository,
    K: QuoteConfigReader,
{
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn import_bytes(
        &self,
        bytes: &[u8],
        file_name: Option<&str>,
    ) -> ImportResult<ImportReport> {
        let settings = self.config.load_settings().await?;
        let mut ctx = BatchContext::new(bytes, file_name, settings);
        info!(batch_id = %ctx.batch_id, "开始导入报价");

        Ok(self.run(&mut ctx).await)
    }

    async fn import_file<P: AsRef<Path> + Send>(&self, file_path: P) -> ImportResult<ImportReport> {
        let path = file_path.as_ref();
        let file_name = path.file_name().and_then(|n| n.to_str()).map(str::to_string);

        match tokio::fs::read(path).await {
            Ok(bytes) => self.import_bytes(&bytes, file_name.as_deref()).await,
            Err(e) => {
                error!(path = %path.display(), error = %e, "文件读取失败");
                let settings = self.config.load_settings().await?;
                let mut ctx = BatchContext::new(&[], file_name.as_deref(), settings);
                ctx.errors.push(ImportFailure::Parse {
                    message: format!("文件读取失败: {}: {}", path.display(), e),
                });
                Ok(ctx.report(ImportStatus::ParseFailed))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use crate::repository::{CustomerRepositoryImpl, QuoteRepositoryImpl};
    use rusqlite::Connection;
    use std::sync::{Arc, Mutex};

    type SqliteOrchestrator =
        ImportOrchestrator<CustomerRepositoryImpl, QuoteRepositoryImpl, QuoteSettings>;

    fn orchestrator() -> SqliteOrchestrator {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));
        ImportOrchestrator::new(
            CustomerRepositoryImpl::from_connection(conn.clone()),
            QuoteRepositoryImpl::from_connection(conn),
            QuoteSettings::default(),
        )
    }

    const CSV: &str = "customer_name,customer_phone,customer_email,location,type,height,width,qty,unit_price,remarks,valid_until\n\
Ali,0501,,Kitchen,Glass,158,158,1,8,,2030-01-01\n\
Ali,0501 ,,Bath,Glass,50,50,1,10,,\n";

    #[tokio::test]
    async fn test_state_sequence_for_valid_batch() {
        let orchestrator = orchestrator();
        let mut ctx = BatchContext::new(CSV.as_bytes(), Some("q.csv"), QuoteSettings::default());

        let mut names = Vec::new();
        let mut state = ImportState::Idle;
        loop {
            state = orchestrator.advance(state, &mut ctx).await;
            names.push(state.name());
            if let ImportState::Reporting(report) = &state {
                assert_eq!(report.status, ImportStatus::Completed);
                assert_eq!(report.success_count, 1);
                break;
            }
        }

        assert_eq!(
            names,
            vec!["Parsing", "Validating", "Grouping", "Reconciling", "Persisting", "Reporting"]
        );
        assert!(matches!(
            orchestrator.advance(state, &mut ctx).await,
            ImportState::Idle
        ));
    }

    #[tokio::test]
    async fn test_validation_failure_jumps_to_reporting() {
        let orchestrator = orchestrator();
        let bad = CSV.replace("Kitchen", "");
        let mut ctx = BatchContext::new(bad.as_bytes(), None, QuoteSettings::default());

        let state = orchestrator.advance(ImportState::Parsing, &mut ctx).await;
        let state = orchestrator.advance(state, &mut ctx).await;

        match state {
            ImportState::Reporting(report) => {
                assert_eq!(report.status, ImportStatus::ValidationFailed);
                assert_eq!(report.success_count, 0);
                assert_eq!(report.validation_errors().len(), 1);
                assert_eq!(report.validation_errors()[0].row, 2);
            }
            other => panic!("unexpected state {}", other.name()),
        }
    }

    #[tokio::test]
    async fn test_progress_reaches_total() {
        let orchestrator = orchestrator();
        let rx = orchestrator.subscribe_progress();

        let report = orchestrator.import_bytes(CSV.as_bytes(), None).await.unwrap();

        let progress = *rx.borrow();
        assert_eq!(report.success_count, 1);
        assert_eq!(progress.total, 1);
        assert_eq!(progress.persisted, 1);
        assert!(progress.is_finished());
    }

    #[tokio::test]
    async fn test_missing_file_is_reported() {
        let orchestrator = orchestrator();
        let report = orchestrator
            .import_file("/definitely/not/here.csv")
            .await
            .unwrap();
        assert_eq!(report.status, ImportStatus::ParseFailed);
        assert_eq!(report.errors.len(), 1);
    }
}
