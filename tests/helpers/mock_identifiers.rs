// ==========================================
// Mock 编号生成器 - 用于集成测试
// ==========================================

use async_trait::async_trait;
use quote_engine::engine::{IdStrategy, IdentifierGenerator};
use quote_engine::repository::{RepositoryError, RepositoryResult};
use std::sync::atomic::{AtomicUsize, Ordering};

/// 第 N 次（从 1 计）生成失败，其余返回 PREFIX-000N
pub struct FlakyIdGenerator {
    calls: AtomicUsize,
    fail_on: usize,
}

impl FlakyIdGenerator {
    pub fn failing_on(n: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on: n,
        }
    }
}

#[async_trait]
impl IdentifierGenerator for FlakyIdGenerator {
    fn strategy(&self) -> IdStrategy {
        IdStrategy::UncheckedRandom
    }

    async fn generate(&self, base: &str, _exclude_id: Option<&str>) -> RepositoryResult<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on {
            return Err(RepositoryError::DatabaseQueryError(
                "mock id generator failure".to_string(),
            ));
        }
        Ok(format!("{}-{:04}", base, call))
    }
}
