//! ユーティリティモジュール

pub mod api;
pub mod config;
pub mod debounce;
pub mod log_trace;

// 共通ヘルパー

/// ビルド日時（build.rs が埋め込む UNIX 秒）を表示用に整形
pub fn build_time_label() -> String {
    let timestamp = option_env!("CAFE_MENU_BUILD_TIME")
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(0);
    format_build_time(timestamp)
}

/// UNIX 秒を UTC の `YYYY-MM-DD HH:MM` にする。0 以下は不明扱い
pub fn format_build_time(timestamp: i64) -> String {
    if timestamp <= 0 {
        return "Built: unknown".to_string();
    }
    let days = timestamp / 86400;
    let remaining = timestamp % 86400;
    let hours = remaining / 3600;
    let minutes = (remaining % 3600) / 60;
    let (year, month, day) = days_to_ymd(days);
    format!("Built: {}-{:02}-{:02} {:02}:{:02} UTC", year, month, day, hours, minutes)
}

fn days_to_ymd(days: i64) -> (i64, i64, i64) {
    // 1970-01-01 からの日数を年月日に変換
    let mut remaining = days;
    let mut year = 1970;
    loop {
        let days_in_year = if is_leap_year(year) { 366 } else { 365 };
        if remaining < days_in_year {
            break;
        }
        remaining -= days_in_year;
        year += 1;
    }
    let days_in_months: [i64; 12] = if is_leap_year(year) {
        [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    } else {
        [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    };
    let mut month = 1;
    for &d in &days_in_months {
        if remaining < d {
            break;
        }
        remaining -= d;
        month += 1;
    }
    (year, month, remaining + 1)
}

fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}
