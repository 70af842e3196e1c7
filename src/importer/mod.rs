// ==========================================
// 蛋品冷链溯源分析系统 - 导入层
// ==========================================
// 职责: 文件解析 → 形态检测 → 字段规范化
// 支持: CSV, Excel, JSON
// ==========================================

pub mod error;
pub mod field_alias;
pub mod file_parser;
pub mod normalizer;
pub mod schema_detector;
pub mod value_parser;

pub use error::{ImportError, ImportResult};
pub use field_alias::{CanonicalField, FieldAliasTable};
pub use file_parser::{CsvParser, ExcelParser, FileParser, InputFormat, JsonParser, UniversalFileParser};
pub use normalizer::{NormalizeOutcome, Normalizer};
pub use schema_detector::SchemaDetector;
