// ==========================================
// 蛋品冷链溯源分析系统 - 配置管理器
// ==========================================
// 职责: 配置覆写的查询、写入、删除
// 存储: config_kv 表 (scope_id='global')
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::pipeline_config::PipelineConfig;
use crate::config::pipeline_config_trait::PipelineConfigReader;
use crate::db::{init_schema, open_sqlite_connection};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例（自动建表）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| ConfigError::Storage(format!("锁获取失败: {}", e)))?;
            crate::db::configure_sqlite_connection(&guard)?;
            init_schema(&guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> ConfigResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ConfigError::Storage(format!("锁获取失败: {}", e)))
    }

    /// 读取单个配置值
    pub fn get(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 列出全部覆写（按键排序）
    pub fn list(&self) -> ConfigResult<Vec<(String, String)>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// 写入覆写（先在默认配置上试应用,非法值不落库）
    pub fn set(&self, key: &str, value: &str) -> ConfigResult<()> {
        let mut probe = PipelineConfig::default();
        probe.apply_override(key, value)?;

        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key.trim(), value.trim()],
        )?;

        info!(config_key = key, "配置覆写已保存");
        Ok(())
    }

    /// 删除覆写,返回是否存在
    pub fn delete(&self, key: &str) -> ConfigResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key.trim()],
        )?;
        Ok(affected > 0)
    }

    /// 默认值 + 已保存覆写
    pub fn load(&self) -> ConfigResult<PipelineConfig> {
        let mut config = PipelineConfig::default();
        let overrides = self.list()?;
        for (key, value) in &overrides {
            config.apply_override(key, value)?;
        }
        config.validate()?;

        debug!(overrides = overrides.len(), "流水线配置加载完成");
        Ok(config)
    }
}

// ==========================================
// PipelineConfigReader Trait 实现
// ==========================================
#[async_trait]
impl PipelineConfigReader for ConfigManager {
    async fn load_pipeline_config(&self) -> ConfigResult<PipelineConfig> {
        self.load()
    }
}
