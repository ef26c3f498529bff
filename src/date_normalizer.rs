use calamine::Data;
use chrono::{Days, NaiveDate};
use regex::Regex;
use once_cell::sync::Lazy;

/// 民国与公元的年份差
const MINGUO_OFFSET: i32 = 1911;

static MINGUO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d{2,3})[/\-.](\d{1,2})[/\-.](\d{1,2})\s*$").expect("valid regex")
});

static MINGUO_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d{2,3})\.(\d{1,2})\s*$").expect("valid regex"));

static DATE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{2,4}[/.\-]\d{1,2}[/.\-]\d{1,2}|\d{4}年\d{1,2}月\d{1,2}日").expect("valid regex")
});

/// 两个完整日期用 `-` 连接的区间，如 `2025/07/01-2025/07/31`、`2025-07-01-2025-07-31`
static DASH_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:\d{2,4}[/.\-]\d{1,2}[/.\-]\d{1,2}|\d{8})\s*-\s*(\d{2,4}[/.\-]\d{1,2}[/.\-]\d{1,2}|\d{8})$",
    )
    .expect("valid regex")
});

static SHEET_DAY_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})(\d{2})-(\d{2})(\d{2})$").expect("valid regex"));

static SHEET_DATE_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{8})-(\d{8})$").expect("valid regex"));

const GREGORIAN_FORMATS: [&str; 5] = ["%Y/%m/%d", "%Y-%m-%d", "%Y.%m.%d", "%Y%m%d", "%Y年%m月%d日"];

fn ymd(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// 民国日期 `YYY/MM/DD` 转为 `YYYYMMDD`，格式不符或日期不存在时返回 None
pub fn minguo_to_gregorian(value: &str) -> Option<String> {
    let caps = MINGUO.captures(value)?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year + MINGUO_OFFSET, month, day).map(ymd)
}

fn gregorian_token(token: &str) -> Option<String> {
    GREGORIAN_FORMATS.iter().find_map(|format| {
        NaiveDate::parse_from_str(token, format)
            .ok()
            .filter(|d| (1900..=2999).contains(&chrono::Datelike::year(d)))
            .map(ymd)
    })
}

fn single_date(value: &str) -> Option<String> {
    let token = value
        .split(|c: char| c.is_whitespace() || c == 'T')
        .find(|t| !t.is_empty())?;
    minguo_to_gregorian(token)
        .or_else(|| gregorian_token(token))
        .or_else(|| {
            // 日期后面还跟着其他文字
            DATE_TOKEN
                .find(value)
                .and_then(|m| minguo_to_gregorian(m.as_str()).or_else(|| gregorian_token(m.as_str())))
        })
}

/// 文本日期标准化；区间（至 / ~ / 两日期间的 -）一律取结束日期
pub fn normalize_date_text(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Some(pos) = value.rfind(['至', '~', '～']) {
        let (head, tail) = value.split_at(pos);
        let tail: String = tail.chars().skip(1).collect();
        return if tail.trim().is_empty() {
            single_date(head)
        } else {
            single_date(&tail)
        };
    }

    if let Some(caps) = DASH_RANGE.captures(value) {
        return single_date(&caps[1]);
    }

    // 2025-07-01 - 2025-07-31
    if let Some(pos) = value.rfind(" - ") {
        if let Some(end) = single_date(&value[pos + 3..]) {
            return Some(end);
        }
    }

    single_date(value)
}

/// Excel 日期序列号转 `YYYYMMDD`（基准 1899-12-30）
pub fn excel_serial_to_date(serial: f64) -> Option<String> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_days(Days::new(serial.floor() as u64)).map(ymd)
}

fn packed_number(value: i64) -> Option<String> {
    if (19000101..=29991231).contains(&value) {
        gregorian_token(&value.to_string())
    } else {
        None
    }
}

/// 单元格日期标准化
pub fn normalize_date(cell: &Data) -> Option<String> {
    match cell {
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()),
        Data::DateTimeIso(s) | Data::String(s) => normalize_date_text(s),
        Data::Int(i) => packed_number(*i),
        Data::Float(f) if f.fract() == 0.0 => packed_number(*f as i64),
        _ => None,
    }
}

/// 一行文字中最后出现的日期
pub fn last_date_in(text: &str) -> Option<String> {
    DATE_TOKEN
        .find_iter(text)
        .filter_map(|m| minguo_to_gregorian(m.as_str()).or_else(|| gregorian_token(m.as_str())))
        .last()
}

/// 民国年月 `114.7` 转为该月最后一天
pub fn minguo_month_end(value: &str) -> Option<String> {
    let caps = MINGUO_MONTH.captures(value)?;
    let year: i32 = caps[1].parse::<i32>().ok()? + MINGUO_OFFSET;
    let month: u32 = caps[2].parse().ok()?;
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(year, month, 1)?;
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?
        .pred_opt()
        .map(ymd)
}

/// 工作表名 `MMDD-MMDD` 取结束日，年份由调用方给出
pub fn sheet_day_range_end(name: &str, year: i32) -> Option<String> {
    let caps = SHEET_DAY_RANGE.captures(name.trim())?;
    let month: u32 = caps[3].parse().ok()?;
    let day: u32 = caps[4].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day).map(ymd)
}

/// 工作表名 `YYYYMMDD-YYYYMMDD` 取结束日
pub fn sheet_date_range_end(name: &str) -> Option<String> {
    let caps = SHEET_DATE_RANGE.captures(name.trim())?;
    gregorian_token(&caps[2])
}
