// Métricas de impacto: tasa general, regularidad, frecuencia, retención,
// día de mayor asistencia y promedio de sesiones por alumno.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{Datelike, Weekday};
use serde::Serialize;

use super::periodo::{self, PeriodWindow, Periodo};
use super::{pct, round2, Metricas, StudentMetric};

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceRate {
    pub periodo: String,
    pub inicio: chrono::NaiveDate,
    pub fin: chrono::NaiveDate,
    pub class_id: Option<i64>,
    pub tasa: f64,
    pub asistencias: usize,
    pub sesiones: usize,
    pub alumnos: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassRate {
    pub class_id: i64,
    pub nombre: String,
    pub dia: String,
    pub horario: String,
    pub sesiones: usize,
    pub asistencias: usize,
    pub alumnos: usize,
    pub tasa: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegularStudents {
    pub periodo: String,
    pub umbral: f64,
    pub total_considerados: usize,
    pub total_regulares: usize,
    pub porcentaje: f64,
    pub alumnos: Vec<StudentMetric>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrequencyBucket {
    pub rango: String,
    pub alumnos: usize,
    pub porcentaje: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentFrequency {
    pub student_id: i64,
    pub nombre: String,
    pub apellido: String,
    pub asistencias: usize,
    pub rango: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrequencyDistribution {
    pub periodo: String,
    pub bucket_1_3: usize,
    pub bucket_4_5: usize,
    pub bucket_6_plus: usize,
    pub total_alumnos: usize,
    pub distribucion: Vec<FrequencyBucket>,
    pub alumnos: Vec<StudentFrequency>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetentionMonth {
    pub anio: i32,
    pub mes: u32,
    pub etiqueta: String,
    pub total_alumnos: usize,
    pub total_mes_anterior: usize,
    pub nuevos: usize,
    pub retenidos: usize,
    pub tasa_retencion: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekdayCount {
    pub dia: String,
    pub asistencias: usize,
    pub es_mayor: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BusiestWeekday {
    pub periodo: String,
    /// `None` si no hubo asistencias en la ventana.
    pub dia_mayor: Option<String>,
    pub conteos: Vec<WeekdayCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentSessions {
    pub student_id: i64,
    pub nombre: String,
    pub apellido: String,
    pub asistencias: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AverageSessions {
    pub periodo: String,
    pub promedio: f64,
    pub total_asistencias: usize,
    pub total_alumnos: usize,
    pub alumnos: Vec<StudentSessions>,
}

pub fn frequency_label(asistencias: usize) -> &'static str {
    match asistencias {
        0 => "0 veces",
        1..=3 => "1-3 veces",
        4 | 5 => "4-5 veces",
        _ => "6 o más veces",
    }
}

impl<'a> Metricas<'a> {
    fn rate_in(&self, window: &PeriodWindow, class_id: Option<i64>) -> (usize, usize, usize) {
        let sesiones = self.data.sessions_between(window.start, window.end, class_id).len();
        let registros = self.data.records_between(window.start, window.end, class_id);
        let asistencias = registros.iter().filter(|(r, _)| self.is_present(r.status)).count();
        let alumnos: HashSet<i64> = registros.iter().map(|(r, _)| r.student_id).collect();
        (asistencias, sesiones, alumnos.len())
    }

    /// present / (sesiones × alumnos distintos con registro), en porcentaje.
    pub fn attendance_rate(&self, periodo: &Periodo, class_id: Option<i64>) -> AttendanceRate {
        let w = periodo.window(self.today);
        let (asistencias, sesiones, alumnos) = self.rate_in(&w, class_id);
        AttendanceRate {
            periodo: periodo.label(self.today),
            inicio: w.start,
            fin: w.last_day(),
            class_id,
            tasa: pct(asistencias, sesiones * alumnos),
            asistencias,
            sesiones,
            alumnos,
        }
    }

    /// Tasa por cada clase activa, ordenada por id.
    pub fn class_breakdown(&self, periodo: &Periodo) -> Vec<ClassRate> {
        let w = periodo.window(self.today);
        let mut clases: Vec<_> = self.data.classes().iter().filter(|c| c.active).collect();
        clases.sort_by_key(|c| c.id);
        clases
            .into_iter()
            .map(|c| {
                let (asistencias, sesiones, alumnos) = self.rate_in(&w, Some(c.id));
                ClassRate {
                    class_id: c.id,
                    nombre: c.name.clone(),
                    dia: c.day.clone(),
                    horario: c.horario(),
                    sesiones,
                    asistencias,
                    alumnos,
                    tasa: pct(asistencias, sesiones * alumnos),
                }
            })
            .collect()
    }

    /// Alumnos con ratio ≥ `umbral`.
    pub fn regular_students(&self, periodo: &Periodo, umbral: f64) -> RegularStudents {
        let w = periodo.window(self.today);
        let metricas = self.student_metrics(&w, None);
        let total = metricas.len();
        let alumnos: Vec<StudentMetric> = metricas.into_iter().filter(|m| m.ratio >= umbral).collect();
        RegularStudents {
            periodo: periodo.label(self.today),
            umbral,
            total_considerados: total,
            total_regulares: alumnos.len(),
            porcentaje: pct(alumnos.len(), total),
            alumnos,
        }
    }

    pub fn frequency_distribution(&self, periodo: &Periodo) -> FrequencyDistribution {
        let w = periodo.window(self.today);
        let mut conteo: BTreeMap<i64, usize> = BTreeMap::new();
        for (r, _) in self.data.records_between(w.start, w.end, None) {
            if self.is_present(r.status) {
                *conteo.entry(r.student_id).or_default() += 1;
            }
        }

        let (mut b13, mut b45, mut b6) = (0, 0, 0);
        let mut alumnos = Vec::with_capacity(conteo.len());
        for (&student_id, &n) in &conteo {
            match n {
                1..=3 => b13 += 1,
                4 | 5 => b45 += 1,
                _ => b6 += 1,
            }
            let (nombre, apellido) = self.student_names(student_id);
            alumnos.push(StudentFrequency {
                student_id,
                nombre,
                apellido,
                asistencias: n,
                rango: frequency_label(n).to_string(),
            });
        }
        let total = conteo.len();
        let distribucion = [("1-3 veces", b13), ("4-5 veces", b45), ("6 o más veces", b6)]
            .into_iter()
            .map(|(rango, n)| FrequencyBucket { rango: rango.to_string(), alumnos: n, porcentaje: pct(n, total) })
            .collect();

        FrequencyDistribution {
            periodo: periodo.label(self.today),
            bucket_1_3: b13,
            bucket_4_5: b45,
            bucket_6_plus: b6,
            total_alumnos: total,
            distribucion,
            alumnos,
        }
    }

    fn present_in_month(&self, year: i32, month: u32) -> BTreeSet<i64> {
        let Ok(w) = periodo::month_window(year, month) else {
            return BTreeSet::new();
        };
        self.data
            .records_between(w.start, w.end, None)
            .into_iter()
            .filter(|(r, _)| self.is_present(r.status))
            .map(|(r, _)| r.student_id)
            .collect()
    }

    /// Retención mes a mes para los últimos `meses` meses de calendario,
    /// empezando por el mes actual. Un alumno que vuelve tras una ausencia
    /// cuenta como nuevo.
    pub fn retention(&self, meses: u32) -> Vec<RetentionMonth> {
        let (y0, m0) = (self.today.year(), self.today.month());
        (0..meses as i32)
            .map(|i| {
                let (y, m) = periodo::shift_month(y0, m0, -i);
                let (py, pm) = periodo::shift_month(y, m, -1);
                let actual = self.present_in_month(y, m);
                let anterior = self.present_in_month(py, pm);
                let retenidos = actual.intersection(&anterior).count();
                RetentionMonth {
                    anio: y,
                    mes: m,
                    etiqueta: periodo::month_label(y, m),
                    total_alumnos: actual.len(),
                    total_mes_anterior: anterior.len(),
                    nuevos: actual.len() - retenidos,
                    retenidos,
                    tasa_retencion: pct(retenidos, anterior.len()),
                }
            })
            .collect()
    }

    /// Empates se resuelven a favor del primer día de la semana (lunes primero).
    pub fn busiest_weekday(&self, periodo: &Periodo) -> BusiestWeekday {
        let w = periodo.window(self.today);
        let mut conteos = [0usize; 7];
        for (r, s) in self.data.records_between(w.start, w.end, None) {
            if self.is_present(r.status) {
                conteos[s.day().weekday().num_days_from_monday() as usize] += 1;
            }
        }

        let mut mayor: Option<usize> = None;
        for (i, &n) in conteos.iter().enumerate() {
            if n > 0 && mayor.is_none_or(|m| n > conteos[m]) {
                mayor = Some(i);
            }
        }

        let dias = [
            Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu,
            Weekday::Fri, Weekday::Sat, Weekday::Sun,
        ];
        BusiestWeekday {
            periodo: periodo.label(self.today),
            dia_mayor: mayor.map(|i| periodo::weekday_name(dias[i]).to_string()),
            conteos: dias
                .iter()
                .enumerate()
                .map(|(i, d)| WeekdayCount {
                    dia: periodo::weekday_name(*d).to_string(),
                    asistencias: conteos[i],
                    es_mayor: mayor == Some(i),
                })
                .collect(),
        }
    }

    /// asistencias / alumnos distintos con algún registro.
    pub fn average_sessions(&self, periodo: &Periodo) -> AverageSessions {
        let w = periodo.window(self.today);
        let mut por_alumno: BTreeMap<i64, usize> = BTreeMap::new();
        for (r, _) in self.data.records_between(w.start, w.end, None) {
            let n = por_alumno.entry(r.student_id).or_default();
            if self.is_present(r.status) {
                *n += 1;
            }
        }
        let total_asistencias: usize = por_alumno.values().sum();
        let total_alumnos = por_alumno.len();
        let promedio = if total_alumnos == 0 { 0.0 } else { round2(total_asistencias as f64 / total_alumnos as f64) };

        let alumnos = por_alumno
            .into_iter()
            .map(|(student_id, asistencias)| {
                let (nombre, apellido) = self.student_names(student_id);
                StudentSessions { student_id, nombre, apellido, asistencias }
            })
            .collect();

        AverageSessions { periodo: periodo.label(self.today), promedio, total_asistencias, total_alumnos, alumnos }
    }
}
