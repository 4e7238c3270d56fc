// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持韩语（默认）、中文和英文
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 支持的语言
pub const SUPPORTED_LOCALES: [&str; 3] = ["ko-KR", "zh-CN", "en"];

/// 默认语言
pub const DEFAULT_LOCALE: &str = "ko-KR";

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言
///
/// 不支持的语言代码回落到默认语言
///
/// # 返回
/// 实际生效的语言代码
pub fn set_locale(locale: &str) -> &'static str {
    let effective = normalize_locale(locale);
    rust_i18n::set_locale(effective);
    effective
}

/// 语言代码规范化（"ko" → "ko-KR", "zh" → "zh-CN"）
pub fn normalize_locale(locale: &str) -> &'static str {
    let lower = locale.trim().to_ascii_lowercase();
    match lower.split(['-', '_']).next().unwrap_or_default() {
        "ko" => "ko-KR",
        "zh" => "zh-CN",
        "en" => "en",
        _ => {
            tracing::warn!(locale, "不支持的语言, 使用默认语言");
            DEFAULT_LOCALE
        }
    }
}

/// 翻译消息（无参数）
///
/// # 示例
/// ```no_run
/// use egg_lot_matching::i18n::t;
/// let msg = t("common.success");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数）
///
/// # 示例
/// ```no_run
/// use egg_lot_matching::i18n::t_with_args;
/// let msg = t_with_args("work_order.rejection.not_confirmed", &[("order_id", "PO-1")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    let mut result = rust_i18n::t!(key).to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}
