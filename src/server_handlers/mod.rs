pub mod docs;
pub mod gestion;
pub mod impacto;

pub use docs::*;

use std::collections::HashMap;

use actix_web::http::header;
use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::error::MetricasError;
use crate::excel::XLSX_CONTENT_TYPE;
use crate::metricas::{validate_threshold, Metricas, Periodo};
use crate::models::parse_date;
use crate::server::AppState;

pub type Params = web::Query<HashMap<String, String>>;

/// Valor no vacío de un parámetro de query.
fn param<'q>(q: &'q HashMap<String, String>, key: &str) -> Option<&'q str> {
    q.get(key).map(|s| s.trim()).filter(|s| !s.is_empty())
}

pub(crate) fn fecha_param(q: &HashMap<String, String>, key: &str) -> Result<Option<NaiveDate>, MetricasError> {
    match param(q, key) {
        None => Ok(None),
        Some(raw) => parse_date(raw)
            .map(Some)
            .ok_or_else(|| MetricasError::InvalidInput(format!("{}: fecha inválida '{}', use YYYY-MM-DD", key, raw))),
    }
}

pub(crate) fn num_param<T: std::str::FromStr>(q: &HashMap<String, String>, key: &str) -> Result<Option<T>, MetricasError> {
    match param(q, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| MetricasError::InvalidInput(format!("{}: se esperaba un número, recibido '{}'", key, raw))),
    }
}

pub(crate) fn periodo_param(q: &HashMap<String, String>) -> Result<Periodo, MetricasError> {
    param(q, "periodo").map(Periodo::parse).unwrap_or(Ok(Periodo::Mes))
}

pub(crate) fn umbral_param(q: &HashMap<String, String>, default: f64) -> Result<f64, MetricasError> {
    let umbral = num_param::<f64>(q, "umbral")?.unwrap_or(default);
    validate_threshold("umbral", umbral)?;
    Ok(umbral)
}

pub(crate) fn error_response(e: &MetricasError) -> HttpResponse {
    if !e.is_client_error() {
        error!(error = %e, "error procesando la petición");
    }
    let body = json!({"error": e.to_string()});
    match e {
        MetricasError::InvalidInput(_) => HttpResponse::BadRequest().json(body),
        MetricasError::NotFound(_) => HttpResponse::NotFound().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}

pub(crate) fn json_response<T: Serialize>(res: Result<T, MetricasError>) -> HttpResponse {
    match res {
        Ok(v) => HttpResponse::Ok().json(v),
        Err(e) => error_response(&e),
    }
}

pub(crate) fn xlsx_response(res: Result<Vec<u8>, MetricasError>, filename: &str) -> HttpResponse {
    match res {
        Ok(buf) => HttpResponse::Ok()
            .content_type(XLSX_CONTENT_TYPE)
            .insert_header((header::CONTENT_DISPOSITION, format!("attachment; filename={}", filename)))
            .body(buf),
        Err(e) => error_response(&e),
    }
}

/// Toma un snapshot del almacén y ejecuta el cálculo fuera del runtime
/// async (la lectura de la base es bloqueante).
pub(crate) async fn con_metricas<T, F>(state: &web::Data<AppState>, f: F) -> Result<T, MetricasError>
where
    T: Send + 'static,
    F: FnOnce(&Metricas) -> Result<T, MetricasError> + Send + 'static,
{
    let store = state.store.clone();
    let policy = state.policy.clone();
    let today = state.today();
    let handle = tokio::task::spawn_blocking(move || {
        let data = store.snapshot()?;
        let m = Metricas::new(&data, &policy, today);
        f(&m)
    });
    match handle.await {
        Ok(res) => res,
        Err(e) => Err(MetricasError::Internal(format!("task join error: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn parametros_vacios_usan_default() {
        let params = q(&[("periodo", ""), ("clase_id", " ")]);
        assert_eq!(periodo_param(&params).unwrap(), Periodo::Mes);
        assert_eq!(num_param::<i64>(&params, "clase_id").unwrap(), None);
    }

    #[test]
    fn parametros_invalidos() {
        assert!(fecha_param(&q(&[("fecha", "15/05/2024")]), "fecha").is_err());
        assert!(num_param::<i64>(&q(&[("clase_id", "abc")]), "clase_id").is_err());
        assert!(periodo_param(&q(&[("periodo", "trimestre")])).is_err());
        assert!(umbral_param(&q(&[("umbral", "1.2")]), 0.5).is_err());
    }
}
