use actix_web::{web, HttpResponse, Responder};

use super::{con_metricas, error_response, json_response, num_param, periodo_param, umbral_param, xlsx_response, Params};
use crate::error::MetricasError;
use crate::reporte::{generate_impact_report, ImpactParams};
use crate::server::AppState;

const MAX_MESES: u32 = 60;

fn meses_param(q: &Params, default: u32) -> Result<u32, MetricasError> {
    let meses = num_param::<u32>(q, "meses")?.unwrap_or(default);
    if meses == 0 || meses > MAX_MESES {
        return Err(MetricasError::InvalidInput(format!("meses debe estar entre 1 y {}", MAX_MESES)));
    }
    Ok(meses)
}

/// GET /impacto/tasa-asistencia?periodo=mes&clase_id=3
pub async fn tasa_asistencia(state: web::Data<AppState>, query: Params) -> impl Responder {
    let (periodo, clase_id) = match (periodo_param(&query), num_param::<i64>(&query, "clase_id")) {
        (Ok(p), Ok(c)) => (p, c),
        (Err(e), _) | (_, Err(e)) => return error_response(&e),
    };
    json_response(
        con_metricas(&state, move |m| {
            m.ensure_class(clase_id)?;
            Ok(m.attendance_rate(&periodo, clase_id))
        })
        .await,
    )
}

/// GET /impacto/asistencia-por-clase?periodo=semana
pub async fn asistencia_por_clase(state: web::Data<AppState>, query: Params) -> impl Responder {
    let periodo = match periodo_param(&query) {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };
    json_response(con_metricas(&state, move |m| Ok(m.class_breakdown(&periodo))).await)
}

/// GET /impacto/alumnos-asistencia-regular?periodo=mes&umbral=0.5
pub async fn alumnos_asistencia_regular(state: web::Data<AppState>, query: Params) -> impl Responder {
    let (periodo, umbral) = match (periodo_param(&query), umbral_param(&query, state.policy.regular_threshold)) {
        (Ok(p), Ok(u)) => (p, u),
        (Err(e), _) | (_, Err(e)) => return error_response(&e),
    };
    json_response(con_metricas(&state, move |m| Ok(m.regular_students(&periodo, umbral))).await)
}

pub async fn frecuencia_asistencia(state: web::Data<AppState>, query: Params) -> impl Responder {
    let periodo = match periodo_param(&query) {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };
    json_response(con_metricas(&state, move |m| Ok(m.frequency_distribution(&periodo))).await)
}

/// GET /impacto/retencion-alumnos?meses=6
pub async fn retencion_alumnos(state: web::Data<AppState>, query: Params) -> impl Responder {
    let meses = match meses_param(&query, state.policy.retention_months) {
        Ok(m) => m,
        Err(e) => return error_response(&e),
    };
    json_response(con_metricas(&state, move |m| Ok(m.retention(meses))).await)
}

pub async fn dia_mayor_asistencia(state: web::Data<AppState>, query: Params) -> impl Responder {
    let periodo = match periodo_param(&query) {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };
    json_response(con_metricas(&state, move |m| Ok(m.busiest_weekday(&periodo))).await)
}

pub async fn promedio_sesiones(state: web::Data<AppState>, query: Params) -> impl Responder {
    let periodo = match periodo_param(&query) {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };
    json_response(con_metricas(&state, move |m| Ok(m.average_sessions(&periodo))).await)
}

fn impact_params(query: &Params, state: &AppState) -> Result<ImpactParams, MetricasError> {
    let mut p = ImpactParams::from_policy(&state.policy);
    p.periodo = periodo_param(query)?;
    p.class_id = num_param::<i64>(query, "clase_id")?;
    p.months_back = meses_param(query, p.months_back)?;
    p.regular_threshold = umbral_param(query, p.regular_threshold)?;
    Ok(p)
}

/// GET /impacto/excel: descarga el reporte de impacto completo.
pub async fn excel_impacto(state: web::Data<AppState>, query: Params) -> HttpResponse {
    let params = match impact_params(&query, &state) {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };
    let res = con_metricas(&state, move |m| generate_impact_report(m, &params)).await;
    xlsx_response(res, "SuperLearner_Metricas_Impacto.xlsx")
}
