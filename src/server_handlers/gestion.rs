use actix_web::{web, HttpResponse, Responder};

use super::{
    con_metricas, error_response, fecha_param, json_response, num_param, periodo_param, umbral_param, xlsx_response,
    Params,
};
use crate::error::MetricasError;
use crate::metricas::GroupCriterion;
use crate::reporte::{generate_management_report, ManagementParams};
use crate::server::AppState;

/// Umbral máximo de faltas consecutivas aceptado por la API.
const MAX_FALTAS: u32 = 365;

fn clase_param(q: &Params) -> Result<Option<i64>, MetricasError> {
    num_param::<i64>(q, "clase_id")
}

fn mes_param(q: &Params) -> Result<Option<u32>, MetricasError> {
    let mes = num_param::<u32>(q, "mes")?;
    if mes.is_some_and(|m| !(1..=12).contains(&m)) {
        return Err(MetricasError::InvalidInput("mes debe estar entre 1 y 12".into()));
    }
    Ok(mes)
}

fn faltas_param(q: &Params, key: &str) -> Result<Option<u32>, MetricasError> {
    let faltas = num_param::<u32>(q, key)?;
    if faltas.is_some_and(|f| f > MAX_FALTAS) {
        return Err(MetricasError::InvalidInput(format!("{} debe estar entre 0 y {}", key, MAX_FALTAS)));
    }
    Ok(faltas)
}

fn dias_param(q: &Params) -> Result<Option<i64>, MetricasError> {
    let dias = num_param::<i64>(q, "dias")?;
    if dias.is_some_and(|d| d < 0) {
        return Err(MetricasError::InvalidInput("dias debe ser >= 0".into()));
    }
    Ok(dias)
}

fn criterio_param(q: &Params) -> Result<GroupCriterion, MetricasError> {
    match q.get("criterio").map(|s| s.trim()).filter(|s| !s.is_empty()) {
        Some(c) => GroupCriterion::parse(c),
        None => Ok(GroupCriterion::Genero),
    }
}

/// GET /gestion/asistencia-diaria?fecha=2024-05-15&clase_id=2
pub async fn asistencia_diaria(state: web::Data<AppState>, query: Params) -> impl Responder {
    let (fecha, clase_id) = match (fecha_param(&query, "fecha"), clase_param(&query)) {
        (Ok(f), Ok(c)) => (f, c),
        (Err(e), _) | (_, Err(e)) => return error_response(&e),
    };
    json_response(con_metricas(&state, move |m| m.daily_list(fecha.unwrap_or(m.today), clase_id)).await)
}

/// GET /gestion/asistencia-semanal?fecha_inicio=2024-05-13
pub async fn asistencia_semanal(state: web::Data<AppState>, query: Params) -> impl Responder {
    let (inicio, clase_id) = match (fecha_param(&query, "fecha_inicio"), clase_param(&query)) {
        (Ok(f), Ok(c)) => (f, c),
        (Err(e), _) | (_, Err(e)) => return error_response(&e),
    };
    json_response(con_metricas(&state, move |m| m.weekly_list(inicio, clase_id)).await)
}

fn mensual_params(q: &Params) -> Result<(Option<u32>, Option<i32>, Option<i64>), MetricasError> {
    Ok((mes_param(q)?, num_param::<i32>(q, "anio")?, clase_param(q)?))
}

/// GET /gestion/asistencia-mensual?mes=5&anio=2024
pub async fn asistencia_mensual(state: web::Data<AppState>, query: Params) -> impl Responder {
    let (mes, anio, clase_id) = match mensual_params(&query) {
        Ok(v) => v,
        Err(e) => return error_response(&e),
    };
    json_response(con_metricas(&state, move |m| m.monthly_list(mes, anio, clase_id)).await)
}

pub async fn asistencia_irregular(state: web::Data<AppState>, query: Params) -> impl Responder {
    let (periodo, umbral) = match (periodo_param(&query), umbral_param(&query, state.policy.irregular_threshold)) {
        (Ok(p), Ok(u)) => (p, u),
        (Err(e), _) | (_, Err(e)) => return error_response(&e),
    };
    json_response(con_metricas(&state, move |m| Ok(m.irregular_students(&periodo, umbral))).await)
}

/// GET /gestion/grupos-asistencia?criterio=sexo|edad&periodo=mes
pub async fn grupos_asistencia(state: web::Data<AppState>, query: Params) -> impl Responder {
    let (criterio, periodo) = match (criterio_param(&query), periodo_param(&query)) {
        (Ok(c), Ok(p)) => (c, p),
        (Err(e), _) | (_, Err(e)) => return error_response(&e),
    };
    json_response(con_metricas(&state, move |m| Ok(m.group_breakdown(criterio, &periodo))).await)
}

pub async fn alumnos_inactivos(state: web::Data<AppState>, query: Params) -> impl Responder {
    let dias = match dias_param(&query) {
        Ok(d) => d.unwrap_or(state.policy.inactive_days),
        Err(e) => return error_response(&e),
    };
    json_response(con_metricas(&state, move |m| Ok(m.inactive_students(dias))).await)
}

/// GET /gestion/faltas-consecutivas?umbral=30
pub async fn faltas_consecutivas(state: web::Data<AppState>, query: Params) -> impl Responder {
    let umbral = match faltas_param(&query, "umbral") {
        Ok(u) => u.unwrap_or(state.policy.streak_threshold),
        Err(e) => return error_response(&e),
    };
    json_response(con_metricas(&state, move |m| Ok(m.absence_streaks(umbral))).await)
}

pub async fn resumen_clases(state: web::Data<AppState>) -> impl Responder {
    json_response(con_metricas(&state, |m| Ok(m.class_summary())).await)
}

fn management_params(query: &Params, state: &AppState) -> Result<ManagementParams, MetricasError> {
    let mut p = ManagementParams::from_policy(&state.policy);
    p.fecha = fecha_param(query, "fecha")?;
    p.semana_inicio = fecha_param(query, "fecha_inicio")?;
    p.mes = mes_param(query)?;
    p.anio = num_param::<i32>(query, "anio")?;
    p.class_id = clase_param(query)?;
    p.periodo = periodo_param(query)?;
    p.criterio = criterio_param(query)?;
    p.irregular_threshold = umbral_param(query, p.irregular_threshold)?;
    if let Some(f) = faltas_param(query, "faltas")? {
        p.streak_threshold = f;
    }
    if let Some(d) = dias_param(query)? {
        p.inactive_days = d;
    }
    Ok(p)
}

/// GET /gestion/excel: descarga el reporte de gestión completo.
pub async fn excel_gestion(state: web::Data<AppState>, query: Params) -> HttpResponse {
    let params = match management_params(&query, &state) {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };
    let res = con_metricas(&state, move |m| generate_management_report(m, &params)).await;
    let filename = format!("metricas_gestion_{}.xlsx", state.today().format("%Y%m%d"));
    xlsx_response(res, &filename)
}
