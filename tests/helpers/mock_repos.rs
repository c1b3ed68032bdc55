// ==========================================
// Mock 仓储实现 - 用于集成测试
// ==========================================
// 内存客户/报价存储；报价存储可指定第 N 次写入失败
// ==========================================

use async_trait::async_trait;
use chrono::Utc;
use quote_engine::domain::{Customer, NewCustomer, Quote};
use quote_engine::repository::{
    CustomerRepository, QuoteRepository, RepositoryError, RepositoryResult,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

// ==========================================
// MemoryCustomerRepo
// ==========================================
#[derive(Default)]
pub struct MemoryCustomerRepo {
    customers: Mutex<Vec<Customer>>,
    create_calls: AtomicUsize,
    fail_phone: Option<String>,
}

impl MemoryCustomerRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定电话的查询始终失败
    pub fn failing_for(phone: &str) -> Self {
        Self {
            fail_phone: Some(phone.to_string()),
            ..Self::default()
        }
    }

    /// 预置已存在客户
    pub fn with_customer(self, customer: NewCustomer) -> Self {
        self.customers.lock().unwrap().push(Customer {
            customer_id: format!("existing-{}", customer.phone),
            name: customer.name,
            phone: customer.phone,
            email: customer.email,
            status: customer.status,
            created_at: Utc::now(),
        });
        self
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn all(&self) -> Vec<Customer> {
        self.customers.lock().unwrap().clone()
    }
}

#[async_trait]
impl CustomerRepository for MemoryCustomerRepo {
    async fn find_by_phone(&self, phone: &str) -> RepositoryResult<Option<Customer>> {
        if self.fail_phone.as_deref() == Some(phone) {
            return Err(RepositoryError::DatabaseQueryError("mock lookup failure".into()));
        }
        Ok(self
            .customers
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.phone == phone)
            .cloned())
    }

    async fn create(&self, customer: NewCustomer) -> RepositoryResult<Customer> {
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let created = Customer {
            customer_id: format!("cust-{}", n),
            name: customer.name,
            phone: customer.phone,
            email: customer.email,
            status: customer.status,
            created_at: Utc::now(),
        };
        self.customers.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, customer_id: &str) -> RepositoryResult<Option<Customer>> {
        Ok(self
            .customers
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.customer_id == customer_id)
            .cloned())
    }
}

// ==========================================
// MemoryQuoteRepo
// ==========================================
#[derive(Default)]
pub struct MemoryQuoteRepo {
    quotes: Mutex<Vec<Quote>>,
    insert_calls: AtomicUsize,
    fail_on_insert: Option<usize>, // 从 1 开始
}

impl MemoryQuoteRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// 第 n 次 insert 失败
    pub fn failing_on(n: usize) -> Self {
        Self {
            fail_on_insert: Some(n),
            ..Self::default()
        }
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn all(&self) -> Vec<Quote> {
        self.quotes.lock().unwrap().clone()
    }
}

#[async_trait]
impl QuoteRepository for MemoryQuoteRepo {
    async fn insert(&self, quote: &Quote) -> RepositoryResult<()> {
        let n = self.insert_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_insert == Some(n) {
            return Err(RepositoryError::DatabaseQueryError(format!(
                "mock insert failure #{}",
                n
            )));
        }
        self.quotes.lock().unwrap().push(quote.clone());
        Ok(())
    }

    async fn get_by_quote_number(&self, quote_number: &str) -> RepositoryResult<Option<Quote>> {
        Ok(self
            .quotes
            .lock()
            .unwrap()
            .iter()
            .find(|q| q.quote_number == quote_number)
            .cloned())
    }

    async fn list_by_customer(&self, customer_id: &str) -> RepositoryResult<Vec<Quote>> {
        Ok(self
            .quotes
            .lock()
            .unwrap()
            .iter()
            .filter(|q| q.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn count(&self) -> RepositoryResult<i64> {
        Ok(self.quotes.lock().unwrap().len() as i64)
    }
}
