//! 客户代码 / 货品代码标准化

/// 不可见的空白字符：不换行空格、数字空格、窄不换行空格、全角空格、零宽空格、BOM
const INVISIBLE: [char; 6] = [
    '\u{00A0}', '\u{2007}', '\u{202F}', '\u{3000}', '\u{200B}', '\u{FEFF}',
];

fn is_spacing(c: char) -> bool {
    c.is_whitespace() || INVISIBLE.contains(&c)
}

/// 标准化代码：去首尾空白、转大写、去内部空白、去掉尾部 `.0`
///
/// `normalize_code(normalize_code(x)) == normalize_code(x)`
pub fn normalize_code(value: &str) -> String {
    let trimmed = value.trim_matches(is_spacing);
    let mut code: String = trimmed
        .to_uppercase()
        .chars()
        .filter(|c| !is_spacing(*c))
        .collect();

    // 数值被读成浮点时会带 .0
    while let Some(stripped) = code.strip_suffix(".0") {
        code = stripped.to_string();
    }
    code
}

/// 清理名称文本：去零宽字符并去首尾空白，内部空格保留
pub fn clean_text(value: &str) -> String {
    value
        .replace(['\u{200B}', '\u{FEFF}'], "")
        .replace(['\u{00A0}', '\u{3000}'], " ")
        .trim()
        .to_string()
}

/// 去掉尾部的 `.0`，用于对照表的目标值和筛选列
pub fn strip_float_suffix(value: &str) -> String {
    let value = value.trim();
    value.strip_suffix(".0").unwrap_or(value).to_string()
}

/// 全角英数字转半角
pub fn fold_full_width(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            _ => c,
        })
        .collect()
}
