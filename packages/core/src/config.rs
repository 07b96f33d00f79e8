//! Централизованная конфигурация ядра чата
//!
//! Опорный часовой пояс и пороги группировки объявлены здесь один раз,
//! чтобы строки вида "America/New_York" не расползались по форматированию.

use std::sync::OnceLock;

use chrono_tz::Tz;

use crate::error::{CoreError, Result};

/// Глобальная конфигурация (синглтон)
static GLOBAL_CONFIG: OnceLock<Config> = OnceLock::new();

/// Переменная окружения для опорного часового пояса
pub const ENV_REFERENCE_ZONE: &str = "CHAT_REFERENCE_ZONE";

/// Переменная окружения для окна группировки (мс)
pub const ENV_GROUP_GAP_MS: &str = "CHAT_GROUP_GAP_MS";

/// Основная структура конфигурации
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    // ============================================
    // ЧАСОВОЙ ПОЯС
    // ============================================

    /// Единый опорный пояс для всех сравнений дат, независимо от
    /// локали сервера или зрителя
    pub reference_zone: Tz,

    // ============================================
    // ГРУППИРОВКА
    // ============================================

    /// Максимальный разрыв между соседними сообщениями одной группы (мс)
    /// По умолчанию: 5 минут
    pub group_gap_ms: i64,

    // ============================================
    // ОТНОСИТЕЛЬНОЕ ВРЕМЯ
    // ============================================

    /// Сколько дней подряд показывать как "{d}d" перед переходом на дату
    pub relative_days_limit: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reference_zone: chrono_tz::America::New_York,
            group_gap_ms: 5 * 60 * 1000, // 5 minutes
            relative_days_limit: 7,
        }
    }
}

impl Config {
    /// Создать конфигурацию из переменных окружения.
    ///
    /// Некорректные значения игнорируются, остаются значения по умолчанию.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var(ENV_REFERENCE_ZONE) {
            match parse_zone(&val) {
                Ok(zone) => config.reference_zone = zone,
                Err(err) => tracing::warn!(%err, "ignoring {}", ENV_REFERENCE_ZONE),
            }
        }

        if let Ok(val) = std::env::var(ENV_GROUP_GAP_MS) {
            match parse_gap(&val) {
                Ok(gap) => config.group_gap_ms = gap,
                Err(err) => tracing::warn!(%err, "ignoring {}", ENV_GROUP_GAP_MS),
            }
        }

        config
    }

    /// Строгий вариант `from_env`: первое некорректное значение возвращается ошибкой.
    pub fn try_from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var(ENV_REFERENCE_ZONE) {
            config.reference_zone = parse_zone(&val)?;
        }
        if let Ok(val) = std::env::var(ENV_GROUP_GAP_MS) {
            config.group_gap_ms = parse_gap(&val)?;
        }

        Ok(config)
    }

    /// Заменить опорный пояс по имени IANA
    pub fn with_reference_zone(mut self, name: &str) -> Result<Self> {
        self.reference_zone = parse_zone(name)?;
        Ok(self)
    }

    /// Получить глобальный экземпляр конфигурации
    ///
    /// Автоматически инициализирует конфигурацию со значениями по умолчанию при первом вызове
    pub fn global() -> &'static Config {
        GLOBAL_CONFIG.get_or_init(Config::default)
    }

    /// Инициализировать глобальную конфигурацию со значениями по умолчанию
    ///
    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init() -> std::result::Result<(), &'static str> {
        GLOBAL_CONFIG
            .set(Self::default())
            .map_err(|_| "Config already initialized")
    }

    /// Инициализировать глобальную конфигурацию из переменных окружения
    ///
    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init_from_env() -> std::result::Result<(), &'static str> {
        GLOBAL_CONFIG
            .set(Self::from_env())
            .map_err(|_| "Config already initialized")
    }

    /// Инициализировать глобальную конфигурацию с кастомным экземпляром
    ///
    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init_with(config: Config) -> std::result::Result<(), &'static str> {
        GLOBAL_CONFIG
            .set(config)
            .map_err(|_| "Config already initialized")
    }

    /// Проверить, инициализирована ли глобальная конфигурация
    pub fn is_initialized() -> bool {
        GLOBAL_CONFIG.get().is_some()
    }
}

fn parse_zone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| CoreError::UnknownTimeZone(name.to_string()))
}

fn parse_gap(raw: &str) -> Result<i64> {
    let gap: i64 = raw
        .trim()
        .parse()
        .map_err(|_| CoreError::InvalidConfig(format!("group gap is not a number: {raw}")))?;
    if gap < 0 {
        return Err(CoreError::InvalidConfig(format!(
            "group gap must be non-negative: {gap}"
        )));
    }
    Ok(gap)
}
