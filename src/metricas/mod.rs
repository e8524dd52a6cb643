// Calculadores de métricas de asistencia.
//
// Todo es cálculo puro sobre una instantánea (`Dataset`): nada aquí toca la
// base de datos ni muta estado compartido.

pub mod periodo;
pub mod impacto;
pub mod gestion;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::MetricasError;
use crate::models::{AttendanceStatus, Dataset, Student};
use periodo::PeriodWindow;

pub use gestion::*;
pub use impacto::*;
pub use periodo::{edad, Periodo};

/// Política de conteo y umbrales. Se aplica igual en todos los calculadores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsPolicy {
    /// Si es true, TARDY cuenta como asistencia en todas las métricas.
    pub count_tardy_as_present: bool,
    pub regular_threshold: f64,
    pub irregular_threshold: f64,
    pub streak_threshold: u32,
    pub inactive_days: i64,
    pub retention_months: u32,
}

impl Default for MetricsPolicy {
    fn default() -> Self {
        MetricsPolicy {
            count_tardy_as_present: false,
            regular_threshold: 0.5,
            irregular_threshold: 0.25,
            streak_threshold: 30,
            inactive_days: 30,
            retention_months: 6,
        }
    }
}

impl MetricsPolicy {
    pub fn counts_as_present(&self, status: AttendanceStatus) -> bool {
        match status {
            AttendanceStatus::Present => true,
            AttendanceStatus::Tardy => self.count_tardy_as_present,
            _ => false,
        }
    }

    /// Etiqueta de estado para listas semanales/mensuales.
    pub fn estatus(&self, ratio: f64) -> &'static str {
        if ratio >= self.regular_threshold {
            "regular"
        } else if ratio < self.irregular_threshold {
            "ausente"
        } else {
            "baja asistencia"
        }
    }

    pub fn validate(&self) -> Result<(), MetricasError> {
        validate_threshold("regular_threshold", self.regular_threshold)?;
        validate_threshold("irregular_threshold", self.irregular_threshold)?;
        if self.irregular_threshold > self.regular_threshold {
            return Err(MetricasError::InvalidInput(format!(
                "irregular_threshold ({}) no puede ser mayor que regular_threshold ({})",
                self.irregular_threshold, self.regular_threshold
            )));
        }
        if self.inactive_days < 0 {
            return Err(MetricasError::InvalidInput("inactive_days debe ser >= 0".into()));
        }
        Ok(())
    }
}

pub fn validate_threshold(name: &str, value: f64) -> Result<(), MetricasError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(MetricasError::InvalidInput(format!("{} debe estar entre 0 y 1 (recibido {})", name, value)))
    }
}

/// Redondea a 2 decimales.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// `num / den × 100` redondeado; 0 cuando el denominador es 0.
pub fn pct(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { round2(num as f64 / den as f64 * 100.0) }
}

/// Estadística por alumno compartida por las listas y las clasificaciones
/// regular / irregular.
#[derive(Debug, Clone, Serialize)]
pub struct StudentMetric {
    pub student_id: i64,
    pub nombre: String,
    pub apellido: String,
    pub genero: String,
    pub edad: Option<u32>,
    pub asistencias: usize,
    pub registros: usize,
    pub total_sesiones: usize,
    pub ratio: f64,
    pub porcentaje: f64,
    pub estatus: String,
}

/// Contexto de cálculo: instantánea + política + fecha de referencia.
#[derive(Debug, Clone, Copy)]
pub struct Metricas<'a> {
    pub data: &'a Dataset,
    pub policy: &'a MetricsPolicy,
    pub today: NaiveDate,
}

impl<'a> Metricas<'a> {
    pub fn new(data: &'a Dataset, policy: &'a MetricsPolicy, today: NaiveDate) -> Self {
        Metricas { data, policy, today }
    }

    pub(crate) fn is_present(&self, status: AttendanceStatus) -> bool {
        self.policy.counts_as_present(status)
    }

    pub(crate) fn ensure_class(&self, class_id: Option<i64>) -> Result<(), MetricasError> {
        match class_id {
            Some(id) if self.data.class(id).is_none() => Err(MetricasError::NotFound(format!("clase {}", id))),
            _ => Ok(()),
        }
    }

    pub(crate) fn student_names(&self, student_id: i64) -> (String, String) {
        self.data
            .student(student_id)
            .map(|s| (s.name.clone(), s.last_name.clone()))
            .unwrap_or_default()
    }

    pub(crate) fn edad_de(&self, student: &Student) -> Option<u32> {
        edad(student.birthdate, self.today)
    }

    /// Métrica de cada alumno con al menos un registro en la ventana.
    ///
    /// Las sesiones posibles son las de la clase filtrada o, sin filtro, las de
    /// las clases donde está inscrito más las clases de sus propios registros.
    /// Alumnos con 0 sesiones posibles quedan fuera. Ordenado por id.
    pub fn student_metrics(&self, window: &PeriodWindow, class_id: Option<i64>) -> Vec<StudentMetric> {
        let mut sesiones_por_clase: HashMap<i64, usize> = HashMap::new();
        for s in self.data.sessions_between(window.start, window.end, class_id) {
            *sesiones_por_clase.entry(s.class_id).or_default() += 1;
        }

        struct Acc {
            presentes: usize,
            registros: usize,
            clases: BTreeSet<i64>,
        }
        let mut por_alumno: BTreeMap<i64, Acc> = BTreeMap::new();
        for (r, s) in self.data.records_between(window.start, window.end, class_id) {
            let acc = por_alumno
                .entry(r.student_id)
                .or_insert_with(|| Acc { presentes: 0, registros: 0, clases: BTreeSet::new() });
            acc.registros += 1;
            if self.is_present(r.status) {
                acc.presentes += 1;
            }
            acc.clases.insert(s.class_id);
        }

        let mut out = Vec::with_capacity(por_alumno.len());
        for (student_id, acc) in por_alumno {
            let total = match class_id {
                Some(c) => sesiones_por_clase.get(&c).copied().unwrap_or(0),
                None => {
                    let mut clases = self.data.enrolled_classes(student_id);
                    clases.extend(acc.clases.iter().copied());
                    clases.iter().map(|c| sesiones_por_clase.get(c).copied().unwrap_or(0)).sum()
                }
            };
            if total == 0 {
                continue;
            }
            let ratio = acc.presentes as f64 / total as f64;
            let student = self.data.student(student_id);
            out.push(StudentMetric {
                student_id,
                nombre: student.map(|s| s.name.clone()).unwrap_or_default(),
                apellido: student.map(|s| s.last_name.clone()).unwrap_or_default(),
                genero: student.map(|s| s.genero().label().to_string()).unwrap_or_else(|| "No especificado".into()),
                edad: student.and_then(|s| self.edad_de(s)),
                asistencias: acc.presentes,
                registros: acc.registros,
                total_sesiones: total,
                ratio,
                porcentaje: round2(ratio * 100.0),
                estatus: self.policy.estatus(ratio).to_string(),
            });
        }
        out
    }
}
