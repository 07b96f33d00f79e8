// Типы ошибок

use thiserror::Error;

/// Ошибки ядра.
///
/// Алгоритмы ленты сами по себе не падают: битые даты и неизвестные
/// форматы отправителя обрабатываются безопасными значениями по умолчанию.
/// Эти варианты нужны только на границах: конфигурация, JSON, outbox.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Unknown time zone: {0}")]
    UnknownTimeZone(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(error: serde_json::Error) -> Self {
        CoreError::Serialization(error.to_string())
    }
}

#[cfg(target_arch = "wasm32")]
impl From<serde_wasm_bindgen::Error> for CoreError {
    fn from(error: serde_wasm_bindgen::Error) -> Self {
        CoreError::Serialization(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

// Для WASM-биндингов
#[cfg(target_arch = "wasm32")]
impl From<CoreError> for wasm_bindgen::JsValue {
    fn from(error: CoreError) -> Self {
        wasm_bindgen::JsValue::from_str(&error.to_string())
    }
}
