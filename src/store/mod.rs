//! Acceso de solo lectura a los datos de asistencia.
//!
//! Cada backend entrega una instantánea completa (`Dataset`); los
//! calculadores nunca consultan la base directamente.

pub mod postgres;
pub mod sqlite;

use std::sync::Arc;

use tracing::warn;

use crate::config::StoreConfig;
use crate::error::MetricasError;
use crate::models::{
    parse_date, parse_datetime, parse_time, AttendanceRecord, AttendanceStatus, ClassSection, Dataset, Session,
    Student, StudentStatus,
};

pub use self::postgres::PostgresStore;
pub use self::sqlite::SqliteStore;

pub trait AttendanceStore: Send + Sync {
    fn snapshot(&self) -> Result<Dataset, MetricasError>;

    /// Nombre corto del backend, para logs.
    fn backend(&self) -> &'static str;
}

/// Almacén en memoria (tests y datos ya cargados).
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Dataset,
}

impl MemoryStore {
    pub fn new(data: Dataset) -> Self {
        MemoryStore { data }
    }
}

impl AttendanceStore for MemoryStore {
    fn snapshot(&self) -> Result<Dataset, MetricasError> {
        Ok(self.data.clone())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// Abre el backend indicado por la configuración. Para SQLite además se
/// asegura de que el esquema exista.
pub fn open_store(cfg: &StoreConfig) -> Result<Arc<dyn AttendanceStore>, MetricasError> {
    match cfg {
        StoreConfig::Sqlite(path) => {
            let store = SqliteStore::new(path);
            store.init_schema()?;
            Ok(Arc::new(store))
        }
        StoreConfig::Postgres(url) => Ok(Arc::new(PostgresStore::new(url.clone()))),
    }
}

// Conversión de filas crudas (comunes a SQLite y Postgres) a modelos.

pub(crate) fn student_from_row(
    id: i64,
    name: String,
    last_name: String,
    gender: Option<String>,
    birthdate: Option<String>,
    status: i64,
) -> Student {
    let birthdate = birthdate.as_deref().and_then(|b| {
        let parsed = parse_date(b).or_else(|| parse_datetime(b).map(|dt| dt.date()));
        if parsed.is_none() && !b.trim().is_empty() {
            warn!(student_id = id, birthdate = b, "fecha de nacimiento ilegible, se ignora");
        }
        parsed
    });
    Student { id, name, last_name, gender, birthdate, status: StudentStatus::from_flag(status) }
}

pub(crate) fn class_from_row(
    id: i64,
    name: String,
    day: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
    status: i64,
) -> ClassSection {
    ClassSection {
        id,
        name,
        day: day.unwrap_or_default(),
        start_time: start_time.as_deref().and_then(parse_time),
        end_time: end_time.as_deref().and_then(parse_time),
        active: status == 1,
    }
}

pub(crate) fn session_from_row(id: i64, class_id: i64, num_session: i64, date: &str) -> Option<Session> {
    match parse_datetime(date) {
        Some(date) => Some(Session { id, class_id, num_session, date }),
        None => {
            warn!(session_id = id, date, "sesión con fecha ilegible, se omite");
            None
        }
    }
}

pub(crate) fn record_from_row(
    id: i64,
    student_id: i64,
    session_id: i64,
    volunteer_id: Option<i64>,
    attendance: Option<String>,
    created: Option<String>,
) -> AttendanceRecord {
    let code = attendance.unwrap_or_default();
    let status = AttendanceStatus::parse(&code).unwrap_or_else(|e| {
        warn!(record_id = id, error = %e, "estado desconocido, se trata como no registrado");
        AttendanceStatus::Unset
    });
    AttendanceRecord {
        id,
        student_id,
        session_id,
        volunteer_id,
        status,
        created: created.as_deref().and_then(parse_datetime),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codigo_desconocido_queda_sin_registro() {
        let r = record_from_row(1, 2, 3, None, Some("MAYBE".into()), None);
        assert_eq!(r.status, AttendanceStatus::Unset);
        let r = record_from_row(1, 2, 3, None, Some("ONTIME".into()), None);
        assert_eq!(r.status, AttendanceStatus::Present);
    }

    #[test]
    fn sesion_con_fecha_invalida_se_omite() {
        assert!(session_from_row(1, 1, 1, "no-es-fecha").is_none());
        assert!(session_from_row(1, 1, 1, "2024-05-01 10:00:00").is_some());
    }
}
