// ==========================================
// 蛋品冷链溯源分析系统 - 字段值解析
// ==========================================
// 职责: 文本清洗 / 时间戳 / 温度 / 箱数 解析
// 红线: 解析失败返回 None,由调用方记录为 Finding,绝不 panic
// ==========================================

use crate::domain::batch::TemperatureReading;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

const DATETIME_FORMATS: [&str; 7] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y%m%d%H%M%S",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

// Excel 日期序列号合理范围（约 1954 ~ 2119 年）
const EXCEL_SERIAL_MIN: f64 = 20_000.0;
const EXCEL_SERIAL_MAX: f64 = 80_000.0;

// 读数对象中的时间键 / 数值键
const READING_TIME_KEYS: [&str; 7] = [
    "timestamp", "time", "ts", "recorded_at", "datetime", "時間", "时间",
];
const READING_VALUE_KEYS: [&str; 7] = [
    "celsius", "value", "temp", "temperature", "reading", "溫度", "温度",
];

/// 文本清洗（TRIM + 空值标准化）
pub fn clean_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// 规范化时间戳输出格式（RFC 3339, UTC）
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn from_excel_serial(serial: f64) -> Option<DateTime<Utc>> {
    if !(EXCEL_SERIAL_MIN..EXCEL_SERIAL_MAX).contains(&serial) {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    Some(Utc.from_utc_datetime(&(base + Duration::milliseconds(millis))))
}

fn parse_timestamp_str(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive));
        }
    }

    // Excel 单元格日期（序列号文本）
    s.parse::<f64>().ok().and_then(from_excel_serial)
}

/// 解析时间戳（无时区视为 UTC）
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_str(s),
        Value::Number(n) => {
            if let Some(secs) = n.as_i64().filter(|v| *v >= 1_000_000_000) {
                // Unix 秒
                return Utc.timestamp_opt(secs, 0).single();
            }
            n.as_f64().and_then(from_excel_serial)
        }
        _ => None,
    }
}

/// 解析通用数值（流量等）
pub fn parse_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// 解析单个摄氏温度值
pub fn parse_celsius(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned = s
                .trim()
                .trim_end_matches("°C")
                .trim_end_matches('℃')
                .trim_end_matches('C')
                .trim_end_matches('c')
                .trim();
            cleaned.replace(',', ".").parse::<f64>().ok()
        }
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn find_key<'v>(obj: &'v serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'v Value> {
    // 按候选键优先级查找
    keys.iter().find_map(|candidate| {
        obj.iter()
            .find(|(k, _)| k.trim().to_lowercase() == *candidate)
            .map(|(_, v)| v)
    })
}

fn parse_reading(item: &Value) -> Option<TemperatureReading> {
    match item {
        Value::Number(_) | Value::String(_) => {
            parse_celsius(item).map(TemperatureReading::representative)
        }
        Value::Array(pair) if pair.len() == 2 => {
            let timestamp = parse_timestamp(&pair[0])?;
            let celsius = parse_celsius(&pair[1])?;
            Some(TemperatureReading::at(timestamp, celsius))
        }
        Value::Object(obj) => {
            let celsius = find_key(obj, &READING_VALUE_KEYS).and_then(parse_celsius)?;
            let timestamp = find_key(obj, &READING_TIME_KEYS).and_then(parse_timestamp);
            Some(TemperatureReading { timestamp, celsius })
        }
        _ => None,
    }
}

/// 解析温度读数
///
/// # 返回
/// (读数列表, 无法解析的元素数)
///
/// # 说明
/// - 全部读数带时间戳时按时间稳定排序；否则保留原顺序
pub fn parse_readings(value: &Value) -> (Vec<TemperatureReading>, usize) {
    let mut readings = Vec::new();
    let mut rejected = 0;

    match value {
        Value::Null => {}
        Value::String(s) if s.contains(';') || s.contains('|') => {
            for part in s.split(|c| c == ';' || c == '|') {
                if part.trim().is_empty() {
                    continue;
                }
                match parse_celsius(&Value::String(part.to_string())) {
                    Some(c) => readings.push(TemperatureReading::representative(c)),
                    None => rejected += 1,
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                match parse_reading(item) {
                    Some(reading) => readings.push(reading),
                    None => rejected += 1,
                }
            }
        }
        other => match parse_reading(other) {
            Some(reading) => readings.push(reading),
            None => rejected += 1,
        },
    }

    if !readings.is_empty() && readings.iter().all(|r| r.timestamp.is_some()) {
        readings.sort_by_key(|r| r.timestamp);
    }

    (readings, rejected)
}

/// 解析箱数（非负整数）
pub fn parse_cartons(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|v| *v >= 0.0 && v.fract() == 0.0 && *v <= u64::MAX as f64)
                .map(|v| v as u64)
        }),
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| *c != ',' && *c != '_' && !c.is_whitespace())
                .collect();
            cleaned.parse::<u64>().ok().or_else(|| {
                cleaned
                    .parse::<f64>()
                    .ok()
                    .filter(|v| *v >= 0.0 && v.fract() == 0.0)
                    .map(|v| v as u64)
            })
        }
        _ => None,
    }
}
