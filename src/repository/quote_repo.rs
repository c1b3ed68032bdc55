// ==========================================
// 加工安装报价系统 - 报价 Repository
// ==========================================
// 职责: 报价整体写入 / 查询（使用 rusqlite）
// 约束: 明细以 JSON 数组整体存储，不存在部分明细落库
// ==========================================

use crate::db::open_and_init;
use crate::domain::quote::{Quote, QuoteItem};
use crate::domain::types::{DiscountType, QuoteStatus};
use crate::repository::customer_repo::parse_timestamp;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// QuoteRepository Trait
// ==========================================
// 用途: 导入落库 / 编辑器保存
// 实现者: QuoteRepositoryImpl（rusqlite）、测试内存实现
#[async_trait]
pub trait QuoteRepository: Send + Sync {
    /// 写入一张完整报价
    async fn insert(&self, quote: &Quote) -> RepositoryResult<()>;

    /// 按报价编号查询（编号不查重，多条命中时取最早一条）
    async fn get_by_quote_number(&self, quote_number: &str) -> RepositoryResult<Option<Quote>>;

    /// 查询客户的全部报价（按创建时间）
    async fn list_by_customer(&self, customer_id: &str) -> RepositoryResult<Vec<Quote>>;

    /// 报价总数
    async fn count(&self) -> RepositoryResult<i64>;
}

#[async_trait]
impl<T: QuoteRepository + ?Sized> QuoteRepository for Arc<T> {
    async fn insert(&self, quote: &Quote) -> RepositoryResult<()> {
        (**self).insert(quote).await
    }

    async fn get_by_quote_number(&self, quote_number: &str) -> RepositoryResult<Option<Quote>> {
        (**self).get_by_quote_number(quote_number).await
    }

    async fn list_by_customer(&self, customer_id: &str) -> RepositoryResult<Vec<Quote>> {
        (**self).list_by_customer(customer_id).await
    }

    async fn count(&self) -> RepositoryResult<i64> {
        (**self).count().await
    }
}

const SELECT_COLUMNS: &str = r#"
    quote_id, customer_id, quote_number, items_json,
    subtotal, discount, vat_amount, total,
    remarks, status, valid_until,
    discount_type, discount_value, shipping_amount, minimum_chargeable_area,
    created_at
"#;

// 数据库原始行（类型转换在锁外完成）
struct QuoteRecordRaw {
    quote_id: String,
    customer_id: String,
    quote_number: String,
    items_json: String,
    subtotal: f64,
    discount: f64,
    vat_amount: f64,
    total: f64,
    remarks: Option<String>,
    status: String,
    valid_until: String,
    discount_type: String,
    discount_value: f64,
    shipping_amount: f64,
    minimum_chargeable_area: f64,
    created_at: String,
}

impl QuoteRecordRaw {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            quote_id: row.get(0)?,
            customer_id: row.get(1)?,
            quote_number: row.get(2)?,
            items_json: row.get(3)?,
            subtotal: row.get(4)?,
            discount: row.get(5)?,
            vat_amount: row.get(6)?,
            total: row.get(7)?,
            remarks: row.get(8)?,
            status: row.get(9)?,
            valid_until: row.get(10)?,
            discount_type: row.get(11)?,
            discount_value: row.get(12)?,
            shipping_amount: row.get(13)?,
            minimum_chargeable_area: row.get(14)?,
            created_at: row.get(15)?,
        })
    }

    fn into_quote(self) -> RepositoryResult<Quote> {
        let items: Vec<QuoteItem> = serde_json::from_str(&self.items_json)?;
        let valid_until = NaiveDate::parse_from_str(&self.valid_until, "%Y-%m-%d").map_err(|e| {
            RepositoryError::FieldValueError {
                field: "valid_until".to_string(),
                message: format!("{} ({})", e, self.valid_until),
            }
        })?;

        Ok(Quote {
            quote_id: self.quote_id,
            customer_id: self.customer_id,
            quote_number: self.quote_number,
            items,
            subtotal: self.subtotal,
            discount: self.discount,
            vat_amount: self.vat_amount,
            total: self.total,
            discount_type: DiscountType::parse(&self.discount_type),
            discount_value: self.discount_value,
            shipping_amount: self.shipping_amount,
            minimum_chargeable_area: self.minimum_chargeable_area,
            remarks: self.remarks,
            status: QuoteStatus::parse(&self.status),
            valid_until,
            created_at: parse_timestamp("created_at", &self.created_at)?,
        })
    }
}

// ==========================================
// QuoteRepositoryImpl
// ==========================================
pub struct QuoteRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl QuoteRepositoryImpl {
    /// 创建新的 Repository 实例（自动建表）
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_and_init(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（与其他仓储共享连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

#[async_trait]
impl QuoteRepository for QuoteRepositoryImpl {
    async fn insert(&self, quote: &Quote) -> RepositoryResult<()> {
        let items_json = serde_json::to_string(&quote.items)?;

        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO quotes (
                quote_id, customer_id, quote_number, items_json,
                subtotal, discount, vat_amount, total,
                remarks, status, valid_until,
                discount_type, discount_value, shipping_amount, minimum_chargeable_area,
                created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16
            )
            "#,
            params![
                quote.quote_id,
                quote.customer_id,
                quote.quote_number,
                items_json,
                quote.subtotal,
                quote.discount,
                quote.vat_amount,
                quote.total,
                quote.remarks,
                quote.status.as_str(),
                quote.valid_until.format("%Y-%m-%d").to_string(),
                quote.discount_type.as_str(),
                quote.discount_value,
                quote.shipping_amount,
                quote.minimum_chargeable_area,
                quote.created_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    async fn get_by_quote_number(&self, quote_number: &str) -> RepositoryResult<Option<Quote>> {
        let raw = {
            let conn = self.lock()?;
            conn.query_row(
                &format!(
                    "SELECT {} FROM quotes WHERE quote_number = ?1 ORDER BY created_at ASC, rowid ASC LIMIT 1",
                    SELECT_COLUMNS
                ),
                params![quote_number],
                QuoteRecordRaw::from_row,
            )
            .optional()?
        };

        raw.map(QuoteRecordRaw::into_quote).transpose()
    }

    async fn list_by_customer(&self, customer_id: &str) -> RepositoryResult<Vec<Quote>> {
        let raws = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM quotes WHERE customer_id = ?1 ORDER BY created_at ASC, rowid ASC",
                SELECT_COLUMNS
            ))?;
            let rows = stmt.query_map(params![customer_id], QuoteRecordRaw::from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        raws.into_iter().map(QuoteRecordRaw::into_quote).collect()
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM quotes", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};
    use crate::domain::customer::NewCustomer;
    use crate::repository::customer_repo::{CustomerRepository, CustomerRepositoryImpl};
    use chrono::Utc;

    fn shared_conn() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        Arc::new(Mutex::new(conn))
    }

    fn sample_quote(customer_id: &str, number: &str) -> Quote {
        let mut item = QuoteItem::new("Hall", "Curtain", 200.0, 150.0, 2, 12.5);
        item.area = 6.0;
        item.chargeable_area = 6.0;
        item.total = 75.0;

        Quote {
            quote_id: uuid::Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            quote_number: number.to_string(),
            items: vec![item],
            subtotal: 75.0,
            discount: 0.0,
            vat_amount: 3.75,
            total: 78.75,
            discount_type: DiscountType::None,
            discount_value: 0.0,
            shipping_amount: 0.0,
            minimum_chargeable_area: 1.0,
            remarks: Some("urgent".to_string()),
            status: QuoteStatus::Draft,
            valid_until: NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let conn = shared_conn();
        let customers = CustomerRepositoryImpl::from_connection(conn.clone());
        let quotes = QuoteRepositoryImpl::from_connection(conn);

        let customer = customers
            .create(NewCustomer::lead("Omar", "0509998888", None))
            .await
            .unwrap();
        let quote = sample_quote(&customer.customer_id, "QT-202610-0042");
        quotes.insert(&quote).await.unwrap();

        let loaded = quotes.get_by_quote_number("QT-202610-0042").await.unwrap().unwrap();
        assert_eq!(loaded.items, quote.items);
        assert_eq!(loaded.valid_until, quote.valid_until);
        assert_eq!(loaded.remarks.as_deref(), Some("urgent"));
        assert_eq!(quotes.count().await.unwrap(), 1);
        assert_eq!(
            quotes.list_by_customer(&customer.customer_id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_insert_with_unknown_customer_fails() {
        let quotes = QuoteRepositoryImpl::from_connection(shared_conn());
        let err = quotes
            .insert(&sample_quote("missing-customer", "QT-202610-0001"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ForeignKeyViolation(_)));
    }
}
