//! 時系列トレースログ
//!
//! `log` クレートのロガーとして登録し、コンソール出力と同時に直近の記録を
//! localStorage に残す。プロフィール画面からダウンロード・コピーできる。

use std::cell::RefCell;
use std::collections::VecDeque;

use log::{Level, LevelFilter, Log, Metadata, Record};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

const MAX_LOG_ENTRIES: usize = 1000;
const STORAGE_KEY: &str = "cafe_menu_log_trace";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,    // "error", "warn", "info", "debug", "trace"
    pub category: String, // "favorites", "search", "api", "router" など
    pub message: String,
}

/// 上限付きの記録バッファ（古いものから捨てる）
#[derive(Debug)]
pub struct TraceBuffer {
    logs: VecDeque<LogEntry>,
    capacity: usize,
}

impl TraceBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            logs: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: LogEntry) {
        while self.logs.len() >= self.capacity.max(1) {
            self.logs.pop_front();
        }
        self.logs.push_back(entry);
    }

    /// 保存済みの JSON から復元する。壊れていれば何もしない
    pub fn restore(&mut self, json: &str) {
        if let Ok(logs) = serde_json::from_str::<Vec<LogEntry>>(json) {
            self.logs.clear();
            for entry in logs {
                self.push(entry);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.logs.iter().cloned().collect()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.logs).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.logs).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn clear(&mut self) {
        self.logs.clear();
    }
}

thread_local! {
    static LOG_TRACE: RefCell<TraceBuffer> = RefCell::new(TraceBuffer::with_capacity(MAX_LOG_ENTRIES));
}

/// `log` 用のロガー本体。記録は thread_local のバッファに持つ
pub struct TraceLogger;

static LOGGER: TraceLogger = TraceLogger;

impl Log for TraceLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let category = record.target().rsplit("::").next().unwrap_or("app").to_string();
        let message = record.args().to_string();
        let line = format!("[{}] {}", category, message);

        // コンソールにも出力
        match record.level() {
            Level::Error => web_sys::console::error_1(&line.into()),
            Level::Warn => web_sys::console::warn_1(&line.into()),
            Level::Debug | Level::Trace => web_sys::console::debug_1(&line.into()),
            Level::Info => web_sys::console::log_1(&line.into()),
        }

        let entry = LogEntry {
            timestamp: now_iso(),
            level: record.level().as_str().to_lowercase(),
            category,
            message,
        };
        LOG_TRACE.with(|trace| {
            // ロガー内から再入した場合は記録を諦める
            if let Ok(mut trace) = trace.try_borrow_mut() {
                trace.push(entry);
                save_to_storage(&trace);
            }
        });
    }

    fn flush(&self) {
        LOG_TRACE.with(|trace| {
            if let Ok(trace) = trace.try_borrow() {
                save_to_storage(&trace);
            }
        });
    }
}

/// 保存済みのトレースを読み込み、ロガーを登録する
pub fn init(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    LOG_TRACE.with(|trace| {
        if let Some(json) = load_from_storage() {
            trace.borrow_mut().restore(&json);
        }
    });
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

fn now_iso() -> String {
    js_sys::Date::new_0().to_iso_string().as_string().unwrap_or_default()
}

fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window()?.local_storage().ok()?
}

fn load_from_storage() -> Option<String> {
    local_storage()?.get_item(STORAGE_KEY).ok()?
}

fn save_to_storage(trace: &TraceBuffer) {
    if let Some(storage) = local_storage() {
        let _ = storage.set_item(STORAGE_KEY, &trace.to_json());
    }
}

pub fn log_count() -> usize {
    LOG_TRACE.with(|trace| trace.borrow().len())
}

pub fn get_logs_json() -> String {
    LOG_TRACE.with(|trace| trace.borrow().to_json_pretty())
}

pub fn clear_logs() {
    LOG_TRACE.with(|trace| {
        let mut trace = trace.borrow_mut();
        trace.clear();
        save_to_storage(&trace);
    });
}

pub fn download_logs() {
    let json_str = get_logs_json();
    let filename = format!("cafe_menu_log_{}.json", now_iso().replace(&[':', '.'][..], "-"));

    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };
    let blob_parts = js_sys::Array::new();
    blob_parts.push(&JsValue::from_str(&json_str));

    let options = web_sys::BlobPropertyBag::new();
    options.set_type("application/json");

    if let Ok(blob) = web_sys::Blob::new_with_str_sequence_and_options(&blob_parts, &options) {
        if let Ok(url) = web_sys::Url::create_object_url_with_blob(&blob) {
            if let Ok(a) = document.create_element("a") {
                let _ = a.set_attribute("href", &url);
                let _ = a.set_attribute("download", &filename);
                if let Some(element) = a.dyn_ref::<web_sys::HtmlElement>() {
                    element.click();
                }
            }
            let _ = web_sys::Url::revoke_object_url(&url);
        }
    }
}

pub async fn copy_logs_to_clipboard_async() -> Result<(), String> {
    let json_str = get_logs_json();
    let window = web_sys::window().ok_or("windowが利用できません")?;
    let promise = window.navigator().clipboard().write_text(&json_str);

    match wasm_bindgen_futures::JsFuture::from(promise).await {
        Ok(_) => {
            log::info!(target: "log-trace", "copied trace log to clipboard");
            Ok(())
        }
        Err(e) => {
            let error_msg = format!("クリップボードへのコピー失敗: {:?}", e);
            log::error!(target: "log-trace", "{}", error_msg);
            Err(error_msg)
        }
    }
}
