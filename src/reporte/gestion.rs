// Reporte de gestión: listas diaria/semanal/mensual, irregulares, grupos,
// faltas consecutivas, inactivos y resumen por clases.

use chrono::{Datelike, NaiveDate};
use tracing::info;

use super::{section_or_error, ReportSection};
use crate::error::MetricasError;
use crate::excel::{encode_workbook, MAX_SHEET_NAME};
use crate::metricas::{AttendanceList, GroupCriterion, Metricas, MetricsPolicy, Periodo, StudentMetric};

pub const HOJA_DIARIA: &str = "Lista Asistencia Diaria";
pub const HOJA_SEMANAL: &str = "Lista Asistencia Semanal";
pub const HOJA_MENSUAL: &str = "Lista Asistencia Mensual";
pub const HOJA_IRREGULARES: &str = "Alumnos Irregulares";
pub const HOJA_INACTIVOS: &str = "Alumnos Inactivos";
pub const HOJA_CLASES: &str = "Resumen por Clases";
pub const HOJA_FALTAS: &str = "Faltas Seguidas";

#[derive(Debug, Clone)]
pub struct ManagementParams {
    /// Día de la lista diaria (por defecto hoy).
    pub fecha: Option<NaiveDate>,
    /// Inicio de la lista semanal (por defecto el lunes de esta semana).
    pub semana_inicio: Option<NaiveDate>,
    pub mes: Option<u32>,
    pub anio: Option<i32>,
    pub class_id: Option<i64>,
    pub periodo: Periodo,
    pub irregular_threshold: f64,
    pub criterio: GroupCriterion,
    pub streak_threshold: u32,
    pub inactive_days: i64,
}

impl ManagementParams {
    pub fn from_policy(policy: &MetricsPolicy) -> Self {
        ManagementParams {
            fecha: None,
            semana_inicio: None,
            mes: None,
            anio: None,
            class_id: None,
            periodo: Periodo::Mes,
            irregular_threshold: policy.irregular_threshold,
            criterio: GroupCriterion::Genero,
            streak_threshold: policy.streak_threshold,
            inactive_days: policy.inactive_days,
        }
    }

    pub fn hoja_grupos(&self) -> &'static str {
        match self.criterio {
            GroupCriterion::Genero => "Grupos por Sexo",
            GroupCriterion::Edad => "Grupos por Edad",
        }
    }

    /// "Más de N Faltas Seguidas"; si no cabe en una hoja de Excel el umbral
    /// queda solo en el bloque resumen.
    pub fn hoja_faltas(&self) -> String {
        let nombre = format!("Más de {} Faltas Seguidas", self.streak_threshold);
        if nombre.chars().count() > MAX_SHEET_NAME {
            return HOJA_FALTAS.to_string();
        }
        nombre
    }

    /// Nombres de hoja en el orden en que aparecen en el libro.
    pub fn sheet_names(&self) -> Vec<String> {
        vec![
            HOJA_DIARIA.to_string(),
            HOJA_SEMANAL.to_string(),
            HOJA_MENSUAL.to_string(),
            HOJA_IRREGULARES.to_string(),
            self.hoja_grupos().to_string(),
            self.hoja_faltas(),
            HOJA_INACTIVOS.to_string(),
            HOJA_CLASES.to_string(),
        ]
    }
}

const COLUMNAS_LISTA: [(&str, &str); 9] = [
    ("student_id", "ID"),
    ("nombre", "Nombre"),
    ("apellido", "Apellido"),
    ("genero", "Sexo"),
    ("edad", "Edad"),
    ("asistencias", "Total Asistencias"),
    ("total_sesiones", "Total Sesiones"),
    ("porcentaje", "Porcentaje Asistencia (%)"),
    ("estatus", "Estatus"),
];

fn fila_alumno(s: &mut ReportSection, a: StudentMetric) {
    s.push_row(vec![
        a.student_id.into(),
        a.nombre.into(),
        a.apellido.into(),
        a.genero.into(),
        a.edad.into(),
        a.asistencias.into(),
        a.total_sesiones.into(),
        a.porcentaje.into(),
        a.estatus.into(),
    ]);
}

fn lista(nombre: &str, l: AttendanceList) -> ReportSection {
    let mut s = ReportSection::new(nombre)
        .summary("Periodo", l.etiqueta.as_str())
        .summary("Desde", l.inicio)
        .summary("Hasta", l.fin)
        .summary("Clase", l.clase.as_str())
        .summary("Total Alumnos", l.total_alumnos)
        .summary("Regulares", l.regulares)
        .summary("Baja Asistencia", l.baja_asistencia)
        .summary("Ausentes", l.ausentes)
        .columns(&COLUMNAS_LISTA);
    for a in l.alumnos {
        fila_alumno(&mut s, a);
    }
    s
}

fn diaria(m: &Metricas, p: &ManagementParams) -> Result<ReportSection, MetricasError> {
    let fecha = p.fecha.unwrap_or(m.today);
    let d = m.daily_list(fecha, p.class_id)?;
    let mut s = ReportSection::new(HOJA_DIARIA)
        .summary("Fecha", d.fecha)
        .summary("Clase", d.clase.as_str())
        .summary("Total Registros", d.total)
        .summary("Presentes", d.presentes)
        .summary("Tardanzas", d.tardanzas)
        .summary("Ausentes", d.ausentes)
        .summary("Justificados", d.justificados)
        .summary("No Registrado", d.sin_registro)
        .columns(&[
            ("student_id", "ID Estudiante"),
            ("nombre", "Nombre"),
            ("apellido", "Apellido"),
            ("genero", "Sexo"),
            ("edad", "Edad"),
            ("clase", "Clase"),
            ("num_session", "Sesión"),
            ("estado", "Asistencia"),
            ("fecha", "Fecha"),
        ]);
    for r in d.alumnos {
        s.push_row(vec![
            r.student_id.into(),
            r.nombre.into(),
            r.apellido.into(),
            r.genero.into(),
            r.edad.into(),
            r.clase.into(),
            r.num_session.into(),
            r.estado.into(),
            d.fecha.into(),
        ]);
    }
    Ok(s)
}

fn semanal(m: &Metricas, p: &ManagementParams) -> Result<ReportSection, MetricasError> {
    Ok(lista(HOJA_SEMANAL, m.weekly_list(p.semana_inicio, p.class_id)?))
}

fn mensual(m: &Metricas, p: &ManagementParams) -> Result<ReportSection, MetricasError> {
    // si solo viene el año se usa el mes actual
    let mes = p.mes.or_else(|| p.anio.map(|_| m.today.month()));
    Ok(lista(HOJA_MENSUAL, m.monthly_list(mes, p.anio, p.class_id)?))
}

fn irregulares(m: &Metricas, p: &ManagementParams) -> Result<ReportSection, MetricasError> {
    let r = m.irregular_students(&p.periodo, p.irregular_threshold);
    let mut s = ReportSection::new(HOJA_IRREGULARES)
        .summary("Periodo", r.periodo.as_str())
        .summary("Umbral (%)", crate::metricas::round2(r.umbral * 100.0))
        .summary("Total Alumnos Irregulares", r.total_irregulares)
        .summary("Total Alumnos Considerados", r.total_considerados)
        .summary("Porcentaje Irregulares (%)", r.porcentaje)
        .columns(&[
            ("student_id", "ID"),
            ("nombre", "Nombre"),
            ("apellido", "Apellido"),
            ("genero", "Sexo"),
            ("edad", "Edad"),
            ("porcentaje", "Porcentaje Asistencia (%)"),
            ("asistencias", "Total Presentes"),
            ("registros", "Total Registros"),
            ("total_sesiones", "Total Sesiones"),
        ]);
    for a in r.alumnos {
        s.push_row(vec![
            a.student_id.into(),
            a.nombre.into(),
            a.apellido.into(),
            a.genero.into(),
            a.edad.into(),
            a.porcentaje.into(),
            a.asistencias.into(),
            a.registros.into(),
            a.total_sesiones.into(),
        ]);
    }
    Ok(s)
}

fn grupos(m: &Metricas, p: &ManagementParams) -> Result<ReportSection, MetricasError> {
    let g = m.group_breakdown(p.criterio, &p.periodo);
    let encabezado = match g.criterio {
        GroupCriterion::Genero => "Sexo",
        GroupCriterion::Edad => "Rango Edad",
    };
    let mut s = ReportSection::new(p.hoja_grupos())
        .summary("Criterio", g.criterio.label())
        .summary("Periodo", g.periodo.as_str())
        .columns(&[
            ("grupo", encabezado),
            ("alumnos", "Total Estudiantes"),
            ("asistencias", "Total Asistencias"),
            ("posibles", "Sesiones Posibles"),
            ("porcentaje", "Porcentaje Asistencia (%)"),
        ]);
    for r in g.grupos {
        s.push_row(vec![r.grupo.into(), r.alumnos.into(), r.asistencias.into(), r.posibles.into(), r.porcentaje.into()]);
    }
    Ok(s)
}

fn faltas(m: &Metricas, p: &ManagementParams) -> Result<ReportSection, MetricasError> {
    let f = m.absence_streaks(p.streak_threshold);
    let mut s = ReportSection::new(p.hoja_faltas())
        .summary("Umbral de Faltas Consecutivas", f.umbral)
        .summary("Alumnos Evaluados", f.total_alumnos)
        .summary("Alumnos que Requieren Seguimiento", f.total_seguimiento)
        .columns(&[
            ("student_id", "ID"),
            ("nombre", "Nombre"),
            ("apellido", "Apellido"),
            ("genero", "Sexo"),
            ("edad", "Edad"),
            ("max_faltas_consecutivas", "Máximo Faltas Consecutivas"),
            ("estado", "Estado"),
        ]);
    for a in f.flagged() {
        s.push_row(vec![
            a.student_id.into(),
            a.nombre.as_str().into(),
            a.apellido.as_str().into(),
            a.genero.as_str().into(),
            a.edad.into(),
            a.max_faltas_consecutivas.into(),
            "Requiere Seguimiento".into(),
        ]);
    }
    Ok(s)
}

fn inactivos(m: &Metricas, p: &ManagementParams) -> Result<ReportSection, MetricasError> {
    let i = m.inactive_students(p.inactive_days);
    let mut s = ReportSection::new(HOJA_INACTIVOS)
        .summary("Días sin Asistencia (límite)", i.dias_limite)
        .summary("Total Alumnos Activos", i.total_activos)
        .summary("Total Alumnos Inactivos", i.total_inactivos)
        .columns(&[
            ("student_id", "ID"),
            ("nombre", "Nombre"),
            ("apellido", "Apellido"),
            ("genero", "Sexo"),
            ("edad", "Edad"),
            ("ultima_asistencia", "Última Asistencia"),
            ("dias_inactivo", "Días sin Asistir"),
            ("clases", "Clases"),
        ]);
    for a in i.alumnos {
        s.push_row(vec![
            a.student_id.into(),
            a.nombre.into(),
            a.apellido.into(),
            a.genero.into(),
            a.edad.into(),
            a.ultima_asistencia.into(),
            a.dias_inactivo.into(),
            a.clases.join(", ").into(),
        ]);
    }
    Ok(s)
}

fn clases(m: &Metricas, _p: &ManagementParams) -> Result<ReportSection, MetricasError> {
    let filas = m.class_summary();
    let mut s = ReportSection::new(HOJA_CLASES)
        .summary("Total Clases", filas.len())
        .summary("Clases Activas", filas.iter().filter(|c| c.activa).count())
        .columns(&[
            ("class_id", "ID Clase"),
            ("nombre", "Nombre Clase"),
            ("dia", "Día"),
            ("horario", "Hora"),
            ("activa", "Activa"),
            ("inscritos", "Total Estudiantes"),
            ("sesiones", "Total Sesiones"),
            ("asistencias", "Total Asistencias"),
            ("ultima_sesion", "Última Sesión"),
            ("tasa", "Tasa Asistencia (%)"),
        ]);
    for c in filas {
        s.push_row(vec![
            c.class_id.into(),
            c.nombre.into(),
            c.dia.into(),
            c.horario.into(),
            (if c.activa { "Sí" } else { "No" }).into(),
            c.inscritos.into(),
            c.sesiones.into(),
            c.asistencias.into(),
            c.ultima_sesion.into(),
            c.tasa.into(),
        ]);
    }
    Ok(s)
}

type Builder = fn(&Metricas, &ManagementParams) -> Result<ReportSection, MetricasError>;

/// Secciones del reporte de gestión. Todas aparecen siempre; una sección
/// que falla se reemplaza por una con el error.
pub fn management_sections(m: &Metricas, p: &ManagementParams) -> Vec<ReportSection> {
    let builders: [Builder; 8] = [diaria, semanal, mensual, irregulares, grupos, faltas, inactivos, clases];
    p.sheet_names()
        .iter()
        .zip(builders)
        .map(|(name, build)| section_or_error(name, build(m, p)))
        .collect()
}

pub fn generate_management_report(m: &Metricas, p: &ManagementParams) -> Result<Vec<u8>, MetricasError> {
    let sections = management_sections(m, p);
    let buf = encode_workbook(&sections)?;
    info!(sheets = sections.len(), bytes = buf.len(), "reporte de gestión generado");
    Ok(buf)
}
