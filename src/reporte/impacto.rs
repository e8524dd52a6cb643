// Reporte de impacto: seis hojas en orden fijo.

use tracing::info;

use super::{section_or_error, CellValue, ReportSection};
use crate::error::MetricasError;
use crate::excel::encode_workbook;
use crate::metricas::{Metricas, MetricsPolicy, Periodo};

pub const HOJA_TASA: &str = "Tasa Asistencia General";
pub const HOJA_REGULARES: &str = "Alumnos Regulares";
pub const HOJA_FRECUENCIA: &str = "Frecuencia Asistencia";
pub const HOJA_RETENCION: &str = "Retención Mes a Mes";
pub const HOJA_DIA_MAYOR: &str = "Día Mayor Asistencia";
pub const HOJA_PROMEDIO: &str = "Promedio Sesiones Alumno";

/// Orden contractual de las hojas del reporte de impacto.
pub const HOJAS_IMPACTO: [&str; 6] = [HOJA_TASA, HOJA_REGULARES, HOJA_FRECUENCIA, HOJA_RETENCION, HOJA_DIA_MAYOR, HOJA_PROMEDIO];

#[derive(Debug, Clone)]
pub struct ImpactParams {
    pub periodo: Periodo,
    pub class_id: Option<i64>,
    pub months_back: u32,
    pub regular_threshold: f64,
}

impl ImpactParams {
    pub fn from_policy(policy: &MetricsPolicy) -> Self {
        ImpactParams {
            periodo: Periodo::Mes,
            class_id: None,
            months_back: policy.retention_months,
            regular_threshold: policy.regular_threshold,
        }
    }
}

fn tasa_general(m: &Metricas, p: &ImpactParams) -> Result<ReportSection, MetricasError> {
    m.ensure_class(p.class_id)?;
    let r = m.attendance_rate(&p.periodo, p.class_id);
    let mut s = ReportSection::new(HOJA_TASA)
        .summary("Periodo", r.periodo.as_str())
        .summary("Desde", r.inicio)
        .summary("Hasta", r.fin)
        .summary(format!("Tasa de Asistencia General - {} (%)", r.periodo), r.tasa)
        .summary("Total de Asistencias", r.asistencias)
        .summary("Total de Sesiones Programadas", r.sesiones)
        .summary("Total Estudiantes Únicos", r.alumnos)
        .columns(&[
            ("class_id", "ID Clase"),
            ("nombre", "Nombre Clase"),
            ("dia", "Día"),
            ("horario", "Hora"),
            ("sesiones", "Sesiones Programadas"),
            ("asistencias", "Total Asistencias"),
            ("alumnos", "Alumnos con Registro"),
            ("tasa", "Tasa Asistencia (%)"),
        ]);
    for c in m.class_breakdown(&p.periodo) {
        if p.class_id.is_some_and(|id| id != c.class_id) {
            continue;
        }
        s.push_row(vec![
            c.class_id.into(),
            c.nombre.into(),
            c.dia.into(),
            c.horario.into(),
            c.sesiones.into(),
            c.asistencias.into(),
            c.alumnos.into(),
            c.tasa.into(),
        ]);
    }
    Ok(s)
}

fn regulares(m: &Metricas, p: &ImpactParams) -> Result<ReportSection, MetricasError> {
    let r = m.regular_students(&p.periodo, p.regular_threshold);
    let umbral = format!("{}%", (p.regular_threshold * 100.0).round());
    let mut s = ReportSection::new(HOJA_REGULARES)
        .summary(format!("Porcentaje de Alumnos Regulares - {}", r.periodo), r.porcentaje)
        .summary(format!("Total Alumnos Regulares (≥{})", umbral), r.total_regulares)
        .summary("Total Alumnos Asistentes", r.total_considerados)
        .summary("Fórmula", format!("Alumnos ≥{} asistencia / Total alumnos asistentes × 100%", umbral))
        .columns(&[
            ("student_id", "ID"),
            ("nombre", "Nombre"),
            ("apellido", "Apellido"),
            ("genero", "Género"),
            ("edad", "Edad"),
            ("asistencias", "Total Asistencias"),
            ("total_sesiones", "Total Sesiones"),
            ("porcentaje", "Porcentaje Asistencia (%)"),
            ("estatus", "Estatus"),
        ]);
    for a in r.alumnos {
        s.push_row(vec![
            a.student_id.into(),
            a.nombre.into(),
            a.apellido.into(),
            a.genero.into(),
            a.edad.into(),
            a.asistencias.into(),
            a.total_sesiones.into(),
            a.porcentaje.into(),
            "Regular".into(),
        ]);
    }
    Ok(s)
}

fn frecuencia(m: &Metricas, p: &ImpactParams) -> Result<ReportSection, MetricasError> {
    let f = m.frequency_distribution(&p.periodo);
    let mut s = ReportSection::new(HOJA_FRECUENCIA)
        .summary("Periodo", f.periodo.as_str())
        .summary("Total Alumnos con Asistencia", f.total_alumnos);
    for b in &f.distribucion {
        s = s.summary(b.rango.as_str(), b.alumnos);
    }
    let mut s = s.columns(&[
        ("rango", "Rango de Asistencias"),
        ("alumnos", "Cantidad de Alumnos"),
        ("porcentaje", "Porcentaje"),
    ]);
    for b in f.distribucion {
        s.push_row(vec![b.rango.into(), b.alumnos.into(), b.porcentaje.into()]);
    }
    Ok(s)
}

fn retencion(m: &Metricas, p: &ImpactParams) -> Result<ReportSection, MetricasError> {
    let meses = m.retention(p.months_back);
    let promedio = if meses.is_empty() {
        0.0
    } else {
        crate::metricas::round2(meses.iter().map(|r| r.tasa_retencion).sum::<f64>() / meses.len() as f64)
    };
    let mut s = ReportSection::new(HOJA_RETENCION)
        .summary("Meses Analizados", p.months_back)
        .summary("Tasa Retención Promedio (%)", promedio)
        .columns(&[
            ("mes", "Mes"),
            ("total_alumnos", "Total Alumnos Mes Actual"),
            ("total_mes_anterior", "Total Alumnos Mes Anterior"),
            ("nuevos", "Alumnos Nuevos"),
            ("retenidos", "Alumnos Retenidos"),
            ("tasa_retencion", "Tasa Retención (%)"),
        ]);
    for r in meses {
        s.push_row(vec![
            r.etiqueta.into(),
            r.total_alumnos.into(),
            r.total_mes_anterior.into(),
            r.nuevos.into(),
            r.retenidos.into(),
            r.tasa_retencion.into(),
        ]);
    }
    Ok(s)
}

fn dia_mayor(m: &Metricas, p: &ImpactParams) -> Result<ReportSection, MetricasError> {
    let d = m.busiest_weekday(&p.periodo);
    let mut s = ReportSection::new(HOJA_DIA_MAYOR)
        .summary("Periodo", d.periodo.as_str())
        .summary("Día con Mayor Asistencia", d.dia_mayor.clone().unwrap_or_else(|| "Sin datos".to_string()))
        .columns(&[
            ("dia", "Día de la Semana"),
            ("asistencias", "Total Asistencias"),
            ("es_mayor", "Es Día Mayor"),
        ]);
    for c in d.conteos {
        s.push_row(vec![c.dia.into(), c.asistencias.into(), CellValue::from(if c.es_mayor { "Sí" } else { "No" })]);
    }
    Ok(s)
}

fn promedio(m: &Metricas, p: &ImpactParams) -> Result<ReportSection, MetricasError> {
    let a = m.average_sessions(&p.periodo);
    let mut s = ReportSection::new(HOJA_PROMEDIO)
        .summary(format!("Promedio de Sesiones por Alumno - {}", a.periodo), a.promedio)
        .summary("Total de Asistencias", a.total_asistencias)
        .summary("Total de Alumnos Únicos", a.total_alumnos)
        .summary("Fórmula", "Total de Asistencias / Total de Alumnos con al menos 1 registro")
        .columns(&[
            ("student_id", "ID"),
            ("nombre", "Nombre"),
            ("apellido", "Apellido"),
            ("asistencias", "Total Asistencias"),
        ]);
    for al in a.alumnos {
        s.push_row(vec![al.student_id.into(), al.nombre.into(), al.apellido.into(), al.asistencias.into()]);
    }
    Ok(s)
}

type Builder = fn(&Metricas, &ImpactParams) -> Result<ReportSection, MetricasError>;

/// Secciones del reporte de impacto, en su orden fijo.
pub fn impact_sections(m: &Metricas, p: &ImpactParams) -> Vec<ReportSection> {
    let builders: [Builder; 6] = [tasa_general, regulares, frecuencia, retencion, dia_mayor, promedio];
    HOJAS_IMPACTO
        .iter()
        .zip(builders)
        .map(|(name, build)| section_or_error(name, build(m, p)))
        .collect()
}

pub fn generate_impact_report(m: &Metricas, p: &ImpactParams) -> Result<Vec<u8>, MetricasError> {
    let sections = impact_sections(m, p);
    let buf = encode_workbook(&sections)?;
    info!(sheets = sections.len(), bytes = buf.len(), "reporte de impacto generado");
    Ok(buf)
}
