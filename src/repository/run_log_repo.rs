// ==========================================
// 蛋品冷链溯源分析系统 - 运行记录仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::run_log::RunLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SELECT_COLUMNS: &str = r#"
    SELECT run_id, dataset_name, shape, record_count, violation_count,
           risk_score, risk_level, terminal_state, report_source, created_at
    FROM pipeline_run_log
"#;

// ==========================================
// RunLogRepository - 运行记录仓储
// ==========================================
/// 职责: pipeline_run_log 表的写入与查询
pub struct RunLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RunLogRepository {
    /// 创建新的 RunLogRepository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例（调用方负责建表）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入一条运行记录
    pub fn insert(&self, log: &RunLog) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO pipeline_run_log (
                run_id, dataset_name, shape, record_count, violation_count,
                risk_score, risk_level, terminal_state, report_source, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                log.run_id,
                log.dataset_name,
                log.shape,
                log.record_count,
                log.violation_count,
                log.risk_score,
                log.risk_level,
                log.terminal_state,
                log.report_source,
                log.created_at.format(TIMESTAMP_FORMAT).to_string(),
            ],
        )?;
        Ok(())
    }

    /// 最近的运行记录（按创建时间倒序）
    pub fn list_recent(&self, limit: usize) -> RepositoryResult<Vec<RunLog>> {
        let conn = self.get_conn()?;
        let sql = format!("{} ORDER BY created_at DESC, rowid DESC LIMIT ?1", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt.query_map(params![limit as i64], |row| Ok(map_row(row)))?;

        let mut logs = Vec::new();
        for row in rows {
            logs.push(row??);
        }
        Ok(logs)
    }

    /// 按 run_id 查询
    ///
    /// # 返回
    /// - Ok(None): 未找到
    pub fn find_by_id(&self, run_id: &str) -> RepositoryResult<Option<RunLog>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE run_id = ?1", SELECT_COLUMNS);
        let result = conn
            .query_row(&sql, params![run_id], |row| Ok(map_row(row)))
            .optional()?;

        result.transpose()
    }
}

fn map_row(row: &Row<'_>) -> RepositoryResult<RunLog> {
    let created_at: String = row.get(9)?;
    let created_at = NaiveDateTime::parse_from_str(&created_at, TIMESTAMP_FORMAT).map_err(|e| {
        RepositoryError::FieldValueError {
            field: "created_at".to_string(),
            message: e.to_string(),
        }
    })?;

    Ok(RunLog {
        run_id: row.get(0)?,
        dataset_name: row.get(1)?,
        shape: row.get(2)?,
        record_count: row.get(3)?,
        violation_count: row.get(4)?,
        risk_score: row.get(5)?,
        risk_level: row.get(6)?,
        terminal_state: row.get(7)?,
        report_source: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
        created_at,
    })
}
