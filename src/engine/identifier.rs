// ==========================================
// 加工安装报价系统 - 编号与 Slug 生成
// ==========================================
// 职责: 统一的 IdentifierGenerator 能力，两种命名策略并存
// - UncheckedRandomId: 报价编号/订单编号，PREFIX-YYYYMM-RRRR，不查重
// - RetryUntilUniqueSlug: URL slug，查重后依次追加 -1, -2, ...
// 说明: 两种策略刻意不合并；随机编号存在小概率碰撞，属已知限制
// ==========================================

use crate::repository::error::RepositoryResult;
use crate::repository::slug_repo::SlugStore;
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 随机段取值上限（4 位，补零）
pub const RANDOM_SEGMENT_UPPER: u32 = 10_000;

/// 报价编号默认前缀
pub const QUOTE_NUMBER_PREFIX: &str = "QT";

/// 订单编号默认前缀
pub const ORDER_NUMBER_PREFIX: &str = "ORD";

// ==========================================
// IdStrategy - 策略标识
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdStrategy {
    UncheckedRandom,
    RetryUntilUnique,
}

// ==========================================
// IdentifierGenerator Trait
// ==========================================
// 调用方只依赖此能力，策略可替换
#[async_trait]
pub trait IdentifierGenerator: Send + Sync {
    /// 当前策略
    fn strategy(&self) -> IdStrategy;

    /// 生成标识
    ///
    /// # 参数
    /// - base: slug 策略为原始标题；随机策略为前缀（空则使用默认前缀）
    /// - exclude_id: 原地更新时排除实体自身（仅 slug 策略使用）
    async fn generate(&self, base: &str, exclude_id: Option<&str>) -> RepositoryResult<String>;
}

// ==========================================
// UncheckedRandomId - 随机编号（不查重）
// ==========================================
#[derive(Debug, Clone)]
pub struct UncheckedRandomId {
    prefix: String,
}

impl UncheckedRandomId {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// 报价编号生成器
    pub fn quote_numbers() -> Self {
        Self::new(QUOTE_NUMBER_PREFIX)
    }

    /// 订单编号生成器
    pub fn order_numbers() -> Self {
        Self::new(ORDER_NUMBER_PREFIX)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// 按当前本地日期生成编号
    pub fn next_id(&self) -> String {
        self.next_id_with_prefix(&self.prefix)
    }

    fn next_id_with_prefix(&self, prefix: &str) -> String {
        let sequence = rand::rng().random_range(0..RANDOM_SEGMENT_UPPER);
        format_random_id(prefix, Local::now().date_naive(), sequence)
    }
}

#[async_trait]
impl IdentifierGenerator for UncheckedRandomId {
    fn strategy(&self) -> IdStrategy {
        IdStrategy::UncheckedRandom
    }

    async fn generate(&self, base: &str, _exclude_id: Option<&str>) -> RepositoryResult<String> {
        let prefix = base.trim();
        if prefix.is_empty() {
            Ok(self.next_id())
        } else {
            Ok(self.next_id_with_prefix(prefix))
        }
    }
}

/// 组装 PREFIX-YYYYMM-RRRR
pub fn format_random_id(prefix: &str, date: NaiveDate, sequence: u32) -> String {
    format!(
        "{}-{}-{:04}",
        prefix,
        date.format("%Y%m"),
        sequence % RANDOM_SEGMENT_UPPER
    )
}

// ==========================================
// RetryUntilUniqueSlug - 查重 slug
// ==========================================
pub struct RetryUntilUniqueSlug<S: SlugStore> {
    store: S,
}

impl<S: SlugStore> RetryUntilUniqueSlug<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: SlugStore> IdentifierGenerator for RetryUntilUniqueSlug<S> {
    fn strategy(&self) -> IdStrategy {
        IdStrategy::RetryUntilUnique
    }

    async fn generate(&self, base: &str, exclude_id: Option<&str>) -> RepositoryResult<String> {
        let base_slug = match slugify(base) {
            s if s.is_empty() => "untitled".to_string(),
            s => s,
        };

        let mut candidate = base_slug.clone();
        let mut suffix: u32 = 0;
        while self.store.slug_exists(&candidate, exclude_id).await? {
            suffix += 1;
            candidate = format!("{}-{}", base_slug, suffix);
        }

        debug!(base = %base_slug, slug = %candidate, attempts = suffix + 1, "slug 生成完成");
        Ok(candidate)
    }
}

/// 标题 → slug（小写，非字母数字折叠为单个 '-'，去首尾 '-'）
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_dash = false;

    for ch in raw.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    struct MemorySlugStore {
        // (slug, owner_id)
        taken: Mutex<Vec<(String, String)>>,
    }

    impl MemorySlugStore {
        fn with(entries: &[(&str, &str)]) -> Self {
            Self {
                taken: Mutex::new(
                    entries
                        .iter()
                        .map(|(s, id)| (s.to_string(), id.to_string()))
                        .collect(),
                ),
            }
        }
    }

    #[async_trait]
    impl SlugStore for MemorySlugStore {
        async fn slug_exists(&self, slug: &str, exclude_id: Option<&str>) -> RepositoryResult<bool> {
            let taken = self.taken.lock().unwrap();
            Ok(taken
                .iter()
                .any(|(s, id)| s == slug && Some(id.as_str()) != exclude_id))
        }
    }

    #[test]
    fn test_format_random_id() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(format_random_id("QT", date, 7), "QT-202603-0007");
        assert_eq!(format_random_id("ORD", date, 9999), "ORD-202603-9999");
    }

    #[test]
    fn test_next_id_shape() {
        let generator = UncheckedRandomId::quote_numbers();
        let id = generator.next_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "QT");
        assert_eq!(parts[1].len(), 6);
        assert_eq!(parts[2].len(), 4);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_unchecked_random_uses_base_as_prefix() {
        let generator = UncheckedRandomId::quote_numbers();
        assert_eq!(generator.strategy(), IdStrategy::UncheckedRandom);

        let order = generator.generate("ORD", None).await.unwrap();
        assert!(order.starts_with("ORD-"));
        let quote = generator.generate("", None).await.unwrap();
        assert!(quote.starts_with("QT-"));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("About Us"), "about-us");
        assert_eq!(slugify("  Glass & Mirrors -- 2026!  "), "glass-mirrors-2026");
        assert_eq!(slugify("***"), "");
    }

    #[tokio::test]
    async fn test_slug_without_collision() {
        let generator = RetryUntilUniqueSlug::new(MemorySlugStore::with(&[]));
        assert_eq!(generator.generate("Our Services", None).await.unwrap(), "our-services");
    }

    #[tokio::test]
    async fn test_slug_appends_suffix_until_free() {
        let store = MemorySlugStore::with(&[
            ("our-services", "p1"),
            ("our-services-1", "p2"),
            ("our-services-2", "p3"),
        ]);
        let generator = RetryUntilUniqueSlug::new(store);
        assert_eq!(generator.generate("Our Services", None).await.unwrap(), "our-services-3");
    }

    #[tokio::test]
    async fn test_slug_excludes_own_id_on_update() {
        let store = MemorySlugStore::with(&[("our-services", "p1")]);
        let generator = RetryUntilUniqueSlug::new(store);

        // p1 原地更新保持原 slug
        assert_eq!(
            generator.generate("Our Services", Some("p1")).await.unwrap(),
            "our-services"
        );
        // 其他实体需要追加后缀
        assert_eq!(
            generator.generate("Our Services", Some("p9")).await.unwrap(),
            "our-services-1"
        );
    }

    #[tokio::test]
    async fn test_generated_slugs_are_distinct_once_registered() {
        let store = MemorySlugStore::with(&[]);
        let generator = RetryUntilUniqueSlug::new(store);
        let mut seen = HashSet::new();

        for i in 0..4 {
            let slug = generator.generate("Home", None).await.unwrap();
            generator
                .store
                .taken
                .lock()
                .unwrap()
                .push((slug.clone(), format!("p{}", i)));
            assert!(seen.insert(slug));
        }
        assert!(seen.contains("home-3"));
    }
}
