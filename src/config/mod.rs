// ==========================================
// 加工安装报价系统 - 配置层
// ==========================================
// 职责: 计价/编号/有效期配置，支持数据库覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod quote_config_trait;
pub mod settings;

// 重导出核心配置
pub use config_manager::{config_keys, ConfigManager};
pub use quote_config_trait::QuoteConfigReader;
pub use settings::QuoteSettings;
