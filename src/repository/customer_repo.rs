// ==========================================
// 加工安装报价系统 - 客户 Repository
// ==========================================
// 职责: 客户按电话查找 / 创建（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::open_and_init;
use crate::domain::customer::{Customer, NewCustomer};
use crate::domain::types::CustomerStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ==========================================
// CustomerRepository Trait
// ==========================================
// 用途: 对账阶段的 lookup-or-create
// 实现者: CustomerRepositoryImpl（rusqlite）、测试内存实现
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// 按电话精确查找（调用方负责 TRIM）
    ///
    /// # 返回
    /// - Ok(Some): 已存在客户（多条命中时取最早创建的一条）
    /// - Ok(None): 不存在
    async fn find_by_phone(&self, phone: &str) -> RepositoryResult<Option<Customer>>;

    /// 创建客户
    async fn create(&self, customer: NewCustomer) -> RepositoryResult<Customer>;

    /// 按 ID 查询
    async fn get_by_id(&self, customer_id: &str) -> RepositoryResult<Option<Customer>>;
}

#[async_trait]
impl<T: CustomerRepository + ?Sized> CustomerRepository for Arc<T> {
    async fn find_by_phone(&self, phone: &str) -> RepositoryResult<Option<Customer>> {
        (**self).find_by_phone(phone).await
    }

    async fn create(&self, customer: NewCustomer) -> RepositoryResult<Customer> {
        (**self).create(customer).await
    }

    async fn get_by_id(&self, customer_id: &str) -> RepositoryResult<Option<Customer>> {
        (**self).get_by_id(customer_id).await
    }
}

// ==========================================
// CustomerRepositoryImpl
// ==========================================
pub struct CustomerRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl CustomerRepositoryImpl {
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

    fn map_row(row: &Row<'_>) -> rusqlite::Result<(String, String, String, Option<String>, String, String)> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
        ))
    }

    fn into_customer(
        raw: (String, String, String, Option<String>, String, String),
    ) -> RepositoryResult<Customer> {
        let (customer_id, name, phone, email, status, created_at) = raw;
        Ok(Customer {
            customer_id,
            name,
            phone,
            email,
            status: CustomerStatus::parse(&status),
            created_at: parse_timestamp("created_at", &created_at)?,
        })
    }
}

#[async_trait]
impl CustomerRepository for CustomerRepositoryImpl {
    async fn find_by_phone(&self, phone: &str) -> RepositoryResult<Option<Customer>> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(
                r#"
                SELECT customer_id, name, phone, email, status, created_at
                FROM customers
                WHERE phone = ?1
                ORDER BY created_at ASC, rowid ASC
                LIMIT 1
                "#,
                params![phone],
                Self::map_row,
            )
            .optional()?;

        raw.map(Self::into_customer).transpose()
    }

    async fn create(&self, customer: NewCustomer) -> RepositoryResult<Customer> {
        let created = Customer {
            customer_id: Uuid::new_v4().to_string(),
            name: customer.name,
            phone: customer.phone,
            email: customer.email,
            status: customer.status,
            created_at: Utc::now(),
        };

        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO customers (customer_id, name, phone, email, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                created.customer_id,
                created.name,
                created.phone,
                created.email,
                created.status.as_str(),
                created.created_at.to_rfc3339(),
            ],
        )?;

        Ok(created)
    }

    async fn get_by_id(&self, customer_id: &str) -> RepositoryResult<Option<Customer>> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(
                r#"
                SELECT customer_id, name, phone, email, status, created_at
                FROM customers
                WHERE customer_id = ?1
                "#,
                params![customer_id],
                Self::map_row,
            )
            .optional()?;

        raw.map(Self::into_customer).transpose()
    }
}

/// RFC3339 文本 → UTC 时间
pub(crate) fn parse_timestamp(field: &str, raw: &str) -> RepositoryResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::FieldValueError {
            field: field.to_string(),
            message: format!("{} ({})", e, raw),
        })
}
