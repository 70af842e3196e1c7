// ==========================================
// 蛋品冷链溯源分析系统 - 文件解析器实现
// ==========================================
// 支持: CSV (.csv) / Excel (.xlsx/.xls) / JSON (.json)
// 输出: serde_json::Value（表格数据为对象数组,保留列顺序）
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

// ==========================================
// 输入格式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Excel,
    Json,
}

impl InputFormat {
    /// 根据扩展名判定格式
    pub fn from_path(path: &Path) -> ImportResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => Ok(InputFormat::Csv),
            "xlsx" | "xls" => Ok(InputFormat::Excel),
            "json" => Ok(InputFormat::Json),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}

// ==========================================
// FileParser Trait
// ==========================================
pub trait FileParser: Send + Sync {
    /// 解析文件为原始结构
    fn parse_file(&self, path: &Path) -> ImportResult<Value>;
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    /// 从任意 Reader 解析（上传内容可直接传入）
    pub fn parse_reader<R: Read>(&self, reader: R) -> ImportResult<Value> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .trim(csv::Trim::All)
            .from_reader(reader);

        // 读取表头
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let mut row = Map::new();

            for (col_idx, value) in record.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    if header.is_empty() {
                        continue;
                    }
                    row.insert(header.clone(), Value::String(value.trim().to_string()));
                }
            }

            // 跳过完全空白的行
            if row.values().all(|v| v.as_str().map(str::is_empty).unwrap_or(false)) {
                continue;
            }

            rows.push(Value::Object(row));
        }

        Ok(Value::Array(rows))
    }
}

impl FileParser for CsvParser {
    fn parse_file(&self, path: &Path) -> ImportResult<Value> {
        ensure_exists(path)?;
        let file = File::open(path)?;
        self.parse_reader(BufReader::new(file))
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_file(&self, path: &Path) -> ImportResult<Value> {
        ensure_exists(path)?;

        let mut workbook = open_workbook_auto(path)?;

        // 读取第一个 sheet
        let sheet_names = workbook.sheet_names().to_owned();
        let sheet_name = sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name)?;

        // 提取表头（第一行）
        let mut rows_iter = range.rows();
        let header_row = match rows_iter.next() {
            Some(row) => row,
            None => return Ok(Value::Array(Vec::new())),
        };

        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for data_row in rows_iter {
            let mut row = Map::new();

            for (col_idx, cell) in data_row.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    if header.is_empty() {
                        continue;
                    }
                    row.insert(header.clone(), Value::String(cell.to_string().trim().to_string()));
                }
            }

            // 跳过完全空白的行
            if row.values().all(|v| v.as_str().map(str::is_empty).unwrap_or(false)) {
                continue;
            }

            rows.push(Value::Object(row));
        }

        Ok(Value::Array(rows))
    }
}

// ==========================================
// JSON Parser 实现
// ==========================================
pub struct JsonParser;

impl JsonParser {
    pub fn parse_str(&self, content: &str) -> ImportResult<Value> {
        Ok(serde_json::from_str(content)?)
    }
}

impl FileParser for JsonParser {
    fn parse_file(&self, path: &Path) -> ImportResult<Value> {
        ensure_exists(path)?;
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<Value> {
        let path = file_path.as_ref();
        let format = InputFormat::from_path(path)?;
        ensure_exists(path)?;
        if std::fs::metadata(path)?.len() == 0 {
            return Err(ImportError::EmptyDataset(path.display().to_string()));
        }
        match format {
            InputFormat::Csv => CsvParser.parse_file(path),
            InputFormat::Excel => ExcelParser.parse_file(path),
            InputFormat::Json => JsonParser.parse_file(path),
        }
    }

    /// 解析内存中的上传内容（Excel 仅支持文件路径）
    pub fn parse_bytes(&self, format: InputFormat, content: &[u8]) -> ImportResult<Value> {
        if content.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(ImportError::EmptyDataset("上传内容".to_string()));
        }
        match format {
            InputFormat::Csv => CsvParser.parse_reader(content),
            InputFormat::Json => Ok(serde_json::from_slice(content)?),
            InputFormat::Excel => Err(ImportError::UnsupportedFormat(
                "xlsx（内存内容）".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_csv_parser_valid_file() {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(temp_file, "batch_id,farm_name,temperature").unwrap();
        writeln!(temp_file, "B001,Sunrise Farm,4.5").unwrap();
        writeln!(temp_file, "B002,Hilltop,9.2").unwrap();

        let value = CsvParser.parse_file(temp_file.path()).unwrap();
        let rows = value.as_array().unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["batch_id"], "B001");
        assert_eq!(rows[1]["temperature"], "9.2");
    }

    #[test]
    fn test_csv_parser_preserves_column_order() {
        let content = "batch_id,truck_temp,storage_temp\nB001,9.0,4.0\n";
        let value = CsvParser.parse_reader(content.as_bytes()).unwrap();
        let keys: Vec<&String> = value[0].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["batch_id", "truck_temp", "storage_temp"]);
    }

    #[test]
    fn test_csv_parser_skip_empty_rows() {
        let content = "batch_id,temperature\nB001,4.5\n,\nB002,3.0\n";
        let value = CsvParser.parse_reader(content.as_bytes()).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_csv_parser_file_not_found() {
        let result = CsvParser.parse_file(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_unsupported_extension() {
        let result = UniversalFileParser.parse("dataset.txt");
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_json_parse_error_is_malformed_input() {
        let result = JsonParser.parse_str("{\"batch_id\": ");
        assert!(matches!(result, Err(ImportError::JsonParseError(_))));
    }

    #[test]
    fn test_zero_byte_file_is_empty_dataset() {
        let temp_file = Builder::new().suffix(".json").tempfile().unwrap();
        let result = UniversalFileParser.parse(temp_file.path());
        assert!(matches!(result, Err(ImportError::EmptyDataset(_))));
    }

    #[test]
    fn test_parse_bytes_json() {
        let value = UniversalFileParser
            .parse_bytes(InputFormat::Json, br#"{"nodes": [], "links": []}"#)
            .unwrap();
        assert!(value.get("nodes").is_some());
    }
}
