// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持英文（默认）和繁体中文
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// 流水线内按调用传入 locale,不修改进程级语言
// ==========================================

use crate::config::pipeline_config::SUPPORTED_LOCALES;

pub const DEFAULT_LOCALE: &str = "en";

/// 规范化语言代码,不支持的语言回退到默认语言
///
/// # 示例
/// ```no_run
/// use egg_trace::i18n::resolve_locale;
/// assert_eq!(resolve_locale("zh-tw"), "zh-TW");
/// ```
pub fn resolve_locale(locale: &str) -> &'static str {
    SUPPORTED_LOCALES
        .iter()
        .copied()
        .find(|l| l.eq_ignore_ascii_case(locale.trim()))
        .unwrap_or(DEFAULT_LOCALE)
}

/// 翻译消息（无参数）
pub fn t_in(locale: &str, key: &str) -> String {
    rust_i18n::t!(key, locale = resolve_locale(locale)).to_string()
}

/// 翻译消息（带参数）
///
/// # 示例
/// ```no_run
/// use egg_trace::i18n::t_in_with_args;
/// let msg = t_in_with_args("en", "report.findings.notices", &[("count", "3")]);
/// ```
pub fn t_in_with_args(locale: &str, key: &str, args: &[(&str, &str)]) -> String {
    let mut result = t_in(locale, key);
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_locale() {
        assert_eq!(resolve_locale("en"), "en");
        assert_eq!(resolve_locale("ZH-tw"), "zh-TW");
        assert_eq!(resolve_locale("fr"), "en");
    }

    #[test]
    fn test_translate_simple() {
        assert_eq!(t_in("en", "report.section.risk_summary"), "Risk Summary");
        assert_eq!(t_in("zh-TW", "report.section.risk_summary"), "風險摘要");
    }

    #[test]
    fn test_translate_with_args() {
        let msg = t_in_with_args("en", "report.findings.notices", &[("count", "3")]);
        assert!(msg.contains('3'));
        assert!(msg.contains("data quality"));

        let msg = t_in_with_args("zh-TW", "report.findings.notices", &[("count", "3")]);
        assert!(msg.contains("資料品質"));
    }

    #[test]
    fn test_unsupported_locale_falls_back() {
        assert_eq!(t_in("fr", "report.section.key_findings"), "Key Findings");
    }
}
