// ==========================================
// 加工安装报价系统 - Slug 查重 Repository
// ==========================================
// 职责: 为 RetryUntilUniqueSlug 提供存在性查询
// 约束: 表名/列名只允许 [A-Za-z0-9_]，值一律参数化
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// SlugStore Trait
// ==========================================
#[async_trait]
pub trait SlugStore: Send + Sync {
    /// slug 是否已被其他实体占用
    ///
    /// # 参数
    /// - slug: 候选 slug
    /// - exclude_id: 原地更新时排除的实体 ID
    async fn slug_exists(&self, slug: &str, exclude_id: Option<&str>) -> RepositoryResult<bool>;
}

#[async_trait]
impl<T: SlugStore + ?Sized> SlugStore for Arc<T> {
    async fn slug_exists(&self, slug: &str, exclude_id: Option<&str>) -> RepositoryResult<bool> {
        (**self).slug_exists(slug, exclude_id).await
    }
}

// ==========================================
// SqliteSlugStore
// ==========================================
pub struct SqliteSlugStore {
    conn: Arc<Mutex<Connection>>,
    table: String,
    id_column: String,
    slug_column: String,
}

impl SqliteSlugStore {
    /// 指定表/列创建查重器
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        table: &str,
        id_column: &str,
        slug_column: &str,
    ) -> RepositoryResult<Self> {
        for name in [table, id_column, slug_column] {
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(RepositoryError::FieldValueError {
                    field: "identifier".to_string(),
                    message: format!("非法表名/列名: {}", name),
                });
            }
        }

        Ok(Self {
            conn,
            table: table.to_string(),
            id_column: id_column.to_string(),
            slug_column: slug_column.to_string(),
        })
    }

    /// pages 表的 slug 查重器
    pub fn pages(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        Self::new(conn, "pages", "page_id", "slug")
    }
}

#[async_trait]
impl SlugStore for SqliteSlugStore {
    async fn slug_exists(&self, slug: &str, exclude_id: Option<&str>) -> RepositoryResult<bool> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let count: i64 = match exclude_id {
            Some(id) => conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM {} WHERE {} = ?1 AND {} <> ?2",
                    self.table, self.slug_column, self.id_column
                ),
                params![slug, id],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM {} WHERE {} = ?1",
                    self.table, self.slug_column
                ),
                params![slug],
                |row| row.get(0),
            )?,
        };

        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use crate::engine::identifier::{IdentifierGenerator, RetryUntilUniqueSlug};

    fn pages_conn() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO pages (page_id, title, slug) VALUES ('p1', 'About', 'about')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO pages (page_id, title, slug) VALUES ('p2', 'About copy', 'about-1')",
            [],
        )
        .unwrap();
        Arc::new(Mutex::new(conn))
    }

    #[test]
    fn test_rejects_unsafe_identifiers() {
        let conn = pages_conn();
        assert!(SqliteSlugStore::new(conn, "pages; DROP TABLE pages", "page_id", "slug").is_err());
    }

    #[tokio::test]
    async fn test_slug_exists_with_exclusion() {
        let store = SqliteSlugStore::pages(pages_conn()).unwrap();
        assert!(store.slug_exists("about", None).await.unwrap());
        assert!(!store.slug_exists("about", Some("p1")).await.unwrap());
        assert!(!store.slug_exists("contact", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_page_slug() {
        let generator = RetryUntilUniqueSlug::new(SqliteSlugStore::pages(pages_conn()).unwrap());
        assert_eq!(generator.generate("About", None).await.unwrap(), "about-2");
        assert_eq!(generator.generate("About", Some("p1")).await.unwrap(), "about");
    }
}
