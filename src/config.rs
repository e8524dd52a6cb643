// Configuración desde variables de entorno (con soporte para `.env`).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::MetricasError;
use crate::metricas::MetricsPolicy;

const DEFAULT_BIND: &str = "127.0.0.1:8080";
const DEFAULT_DB_PATH: &str = "data/metricas.db";

#[derive(Debug, Clone, PartialEq)]
pub enum StoreConfig {
    Sqlite(PathBuf),
    /// URL completa postgres://...
    Postgres(String),
}

impl StoreConfig {
    /// Interpreta METRICAS_DB_URL. Acepta sqlite://, file://, postgres://,
    /// postgresql:// o una ruta sin esquema.
    pub fn from_url(url: &str) -> Result<Self, MetricasError> {
        let url = url.trim();
        if let Some(path) = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("file://")) {
            Ok(StoreConfig::Sqlite(PathBuf::from(path)))
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(StoreConfig::Postgres(url.to_string()))
        } else if url.contains("://") {
            Err(MetricasError::Config(format!("METRICAS_DB_URL usa un esquema no soportado: {}", url)))
        } else {
            Ok(StoreConfig::Sqlite(PathBuf::from(url)))
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub store: StoreConfig,
    pub policy: MetricsPolicy,
}

fn parse_var<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, MetricasError> {
    match get(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|_| MetricasError::Config(format!("{}: valor inválido '{}'", key, raw))),
        _ => Ok(default),
    }
}

fn parse_bool(get: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> Result<bool, MetricasError> {
    match get(key).map(|v| v.trim().to_lowercase()) {
        None => Ok(default),
        Some(v) if v.is_empty() => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "si" | "sí" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            _ => Err(MetricasError::Config(format!("{}: se esperaba true/false, recibido '{}'", key, v))),
        },
    }
}

impl Config {
    /// Carga `.env` si existe y lee el entorno del proceso.
    pub fn from_env() -> Result<Self, MetricasError> {
        let _ = dotenv::dotenv();
        Config::from_lookup(|k| env::var(k).ok())
    }

    /// Construye la configuración a partir de una función de búsqueda.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, MetricasError> {
        let bind = get("METRICAS_BIND")
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIND.to_string());

        // la URL tiene prioridad sobre la ruta
        let store = match get("METRICAS_DB_URL").filter(|u| !u.trim().is_empty()) {
            Some(url) => StoreConfig::from_url(&url)?,
            None => StoreConfig::Sqlite(PathBuf::from(
                get("METRICAS_DB_PATH")
                    .filter(|p| !p.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            )),
        };

        let d = MetricsPolicy::default();
        let policy = MetricsPolicy {
            count_tardy_as_present: parse_bool(&get, "METRICAS_COUNT_TARDY", d.count_tardy_as_present)?,
            regular_threshold: parse_var(&get, "METRICAS_UMBRAL_REGULAR", d.regular_threshold)?,
            irregular_threshold: parse_var(&get, "METRICAS_UMBRAL_IRREGULAR", d.irregular_threshold)?,
            streak_threshold: parse_var(&get, "METRICAS_FALTAS_SEGUIDAS", d.streak_threshold)?,
            inactive_days: parse_var(&get, "METRICAS_DIAS_INACTIVO", d.inactive_days)?,
            retention_months: parse_var(&get, "METRICAS_MESES_RETENCION", d.retention_months)?,
        };
        policy.validate().map_err(|e| MetricasError::Config(e.to_string()))?;

        Ok(Config { bind, store, policy })
    }
}
