// WASM bindings

use chrono::{DateTime, Utc};
use wasm_bindgen::prelude::*;

use crate::api::ChatCoreAPI;
use crate::config::Config;
use crate::error::CoreError;
use crate::protocol::{LocalFlags, TimeValue};
use crate::state::delivery::DeliveryStatus;

use super::console;

/// Инициализация: panic hook и глобальная конфигурация с заданным поясом.
/// Повторный вызов ничего не ломает.
#[wasm_bindgen]
pub fn init_core(reference_zone: Option<String>) -> Result<(), JsValue> {
    console::init_logging();

    if Config::is_initialized() {
        return Ok(());
    }
    let config = match reference_zone {
        Some(zone) => Config::default().with_reference_zone(&zone)?,
        None => Config::default(),
    };
    Config::init_with(config).map_err(JsValue::from_str)
}

/// Построить ленту.
/// messages_json - JSON-массив сообщений от старых к новым
/// typing_json - JSON-массив индикаторов "печатает" (опционально)
/// now_ms - текущее время клиента; без него берётся `Date.now()`
#[wasm_bindgen]
pub fn build_timeline(
    messages_json: String,
    viewer: Option<String>,
    typing_json: Option<String>,
    now_ms: Option<f64>,
) -> Result<String, JsValue> {
    let now = resolve_now(now_ms)?;
    ChatCoreAPI::default()
        .timeline_json(&messages_json, viewer.as_deref(), typing_json.as_deref(), now)
        .map_err(|e| {
            console::error(&e.to_string());
            e.into()
        })
}

/// Отсортировать беседы по последней активности
#[wasm_bindgen]
pub fn rank_conversations(conversations_json: String) -> Result<String, JsValue> {
    ChatCoreAPI::default()
        .rank_conversations_json(&conversations_json)
        .map_err(Into::into)
}

/// Статус доставки по объекту флагов `{ isOptimistic, isQueued, failed }`
#[wasm_bindgen]
pub fn delivery_status(flags: JsValue) -> Result<String, JsValue> {
    let flags: LocalFlags = serde_wasm_bindgen::from_value(flags).map_err(CoreError::from)?;
    Ok(DeliveryStatus::resolve(&flags).as_str().to_string())
}

/// "now" / "5m" / "3h" / "2d" / "Jan 3"
#[wasm_bindgen]
pub fn format_relative_time(timestamp: String, now_ms: Option<f64>) -> Result<String, JsValue> {
    let now = resolve_now(now_ms)?;
    let value = TimeValue::Text(timestamp);
    Ok(ChatCoreAPI::default()
        .normalizer()
        .format_relative(Some(&value), now))
}

fn resolve_now(now_ms: Option<f64>) -> Result<DateTime<Utc>, CoreError> {
    let ms = now_ms.unwrap_or_else(js_sys::Date::now) as i64;
    // Тот же допустимый диапазон, что и у времени сообщений
    ChatCoreAPI::default()
        .normalizer()
        .parse(&TimeValue::Millis(ms))
        .ok_or_else(|| CoreError::InvalidTimestamp(format!("now = {}", ms)))
}
