// ==========================================
// 加工安装报价系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 规则: 配置缺失或格式错误时回退默认值（记录告警）
// ==========================================

use crate::config::quote_config_trait::QuoteConfigReader;
use crate::config::settings::{
    DEFAULT_CURRENCY, DEFAULT_MINIMUM_CHARGEABLE_AREA, DEFAULT_QUOTE_VALIDITY_DAYS,
    MAX_QUOTE_VALIDITY_DAYS,
};
use crate::db::{configure_sqlite_connection, open_and_init};
use crate::engine::aggregator::VAT_RATE;
use crate::engine::identifier::{ORDER_NUMBER_PREFIX, QUOTE_NUMBER_PREFIX};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::warn;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_and_init(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 写入 global scope 配置（存在则覆盖）
    pub fn update_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT (scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;

        Ok(())
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// 读取字符串配置，缺失/空值时返回默认值
    fn get_string_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self
            .get_config_value(key)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.to_string()))
    }

    /// 读取数值配置，缺失或格式错误时返回默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> RepositoryResult<T>
    where
        T: FromStr + Copy + std::fmt::Display,
    {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    warn!(config_key = key, value = %raw, default = %default, "配置值格式错误，使用默认值");
                    Ok(default)
                }
            },
        }
    }
}

// ==========================================
// 实现 QuoteConfigReader
// ==========================================
#[async_trait]
impl QuoteConfigReader for ConfigManager {
    async fn get_vat_rate(&self) -> RepositoryResult<f64> {
        let rate = self.get_parsed_or_default(config_keys::VAT_RATE, VAT_RATE)?;
        if !(0.0..1.0).contains(&rate) {
            warn!(vat_rate = rate, "VAT 税率超出 [0, 1)，使用默认值");
            return Ok(VAT_RATE);
        }
        Ok(rate)
    }

    async fn get_minimum_chargeable_area(&self) -> RepositoryResult<f64> {
        let area = self.get_parsed_or_default(
            config_keys::MINIMUM_CHARGEABLE_AREA,
            DEFAULT_MINIMUM_CHARGEABLE_AREA,
        )?;
        Ok(if area.is_finite() && area >= 0.0 {
            area
        } else {
            DEFAULT_MINIMUM_CHARGEABLE_AREA
        })
    }

    async fn get_default_currency(&self) -> RepositoryResult<String> {
        self.get_string_or_default(config_keys::DEFAULT_CURRENCY, DEFAULT_CURRENCY)
    }

    async fn get_quote_number_prefix(&self) -> RepositoryResult<String> {
        self.get_string_or_default(config_keys::QUOTE_NUMBER_PREFIX, QUOTE_NUMBER_PREFIX)
    }

    async fn get_order_number_prefix(&self) -> RepositoryResult<String> {
        self.get_string_or_default(config_keys::ORDER_NUMBER_PREFIX, ORDER_NUMBER_PREFIX)
    }

    async fn get_quote_validity_days(&self) -> RepositoryResult<i64> {
        let days =
            self.get_parsed_or_default(config_keys::QUOTE_VALIDITY_DAYS, DEFAULT_QUOTE_VALIDITY_DAYS)?;
        if days > MAX_QUOTE_VALIDITY_DAYS {
            warn!(quote_validity_days = days, max = MAX_QUOTE_VALIDITY_DAYS, "报价有效期超出上限，按上限处理");
            return Ok(MAX_QUOTE_VALIDITY_DAYS);
        }
        Ok(days.max(0))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 计价
    pub const VAT_RATE: &str = "vat_rate";
    pub const MINIMUM_CHARGEABLE_AREA: &str = "minimum_chargeable_area";
    pub const DEFAULT_CURRENCY: &str = "default_currency";

    // 编号
    pub const QUOTE_NUMBER_PREFIX: &str = "quote_number_prefix";
    pub const ORDER_NUMBER_PREFIX: &str = "order_number_prefix";

    // 有效期
    pub const QUOTE_VALIDITY_DAYS: &str = "quote_validity_days";
}
