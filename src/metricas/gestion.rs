// Métricas de gestión: listas de asistencia, alumnos irregulares, grupos,
// inactividad, faltas consecutivas y resumen por clase.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::periodo::{self, Periodo};
use super::{pct, Metricas, StudentMetric};
use crate::error::MetricasError;
use crate::models::{AttendanceStatus, Genero};

#[derive(Debug, Clone, Serialize)]
pub struct DailyRow {
    pub student_id: i64,
    pub nombre: String,
    pub apellido: String,
    pub genero: String,
    pub edad: Option<u32>,
    pub clase: String,
    pub num_session: i64,
    pub estado: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyList {
    pub fecha: NaiveDate,
    pub clase: String,
    pub total: usize,
    pub presentes: usize,
    pub tardanzas: usize,
    pub ausentes: usize,
    pub justificados: usize,
    pub sin_registro: usize,
    pub alumnos: Vec<DailyRow>,
}

/// Lista semanal o mensual.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceList {
    pub etiqueta: String,
    pub inicio: NaiveDate,
    pub fin: NaiveDate,
    pub clase: String,
    pub total_alumnos: usize,
    pub regulares: usize,
    pub baja_asistencia: usize,
    pub ausentes: usize,
    pub alumnos: Vec<StudentMetric>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrregularStudents {
    pub periodo: String,
    pub umbral: f64,
    pub total_considerados: usize,
    pub total_irregulares: usize,
    pub porcentaje: f64,
    pub alumnos: Vec<StudentMetric>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupCriterion {
    Genero,
    Edad,
}

impl GroupCriterion {
    pub fn parse(s: &str) -> Result<Self, MetricasError> {
        match s.trim().to_lowercase().as_str() {
            "sexo" | "genero" | "género" | "gender" => Ok(GroupCriterion::Genero),
            "edad" | "age" | "age_bucket" => Ok(GroupCriterion::Edad),
            other => Err(MetricasError::InvalidInput(format!("criterio desconocido '{}': use sexo o edad", other))),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GroupCriterion::Genero => "Sexo",
            GroupCriterion::Edad => "Edad",
        }
    }
}

pub const SIN_FECHA_NACIMIENTO: &str = "Sin fecha de nacimiento";
const RANGOS_EDAD: [&str; 5] = ["0-5", "6-12", "13-17", "18+", SIN_FECHA_NACIMIENTO];

pub fn age_bucket(edad: Option<u32>) -> &'static str {
    match edad {
        None => SIN_FECHA_NACIMIENTO,
        Some(0..=5) => "0-5",
        Some(6..=12) => "6-12",
        Some(13..=17) => "13-17",
        Some(_) => "18+",
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupRow {
    pub grupo: String,
    pub alumnos: usize,
    pub asistencias: usize,
    pub posibles: usize,
    pub porcentaje: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupBreakdown {
    pub criterio: GroupCriterion,
    pub periodo: String,
    pub grupos: Vec<GroupRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InactiveStudent {
    pub student_id: i64,
    pub nombre: String,
    pub apellido: String,
    pub genero: String,
    pub edad: Option<u32>,
    pub ultima_asistencia: Option<NaiveDate>,
    /// `None` si nunca asistió.
    pub dias_inactivo: Option<i64>,
    pub clases: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InactiveStudents {
    pub dias_limite: i64,
    pub total_activos: usize,
    pub total_inactivos: usize,
    pub alumnos: Vec<InactiveStudent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentStreak {
    pub student_id: i64,
    pub nombre: String,
    pub apellido: String,
    pub genero: String,
    pub edad: Option<u32>,
    pub max_faltas_consecutivas: u32,
    pub requiere_seguimiento: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AbsenceStreaks {
    pub umbral: u32,
    pub total_alumnos: usize,
    pub total_seguimiento: usize,
    /// Todos los alumnos con registros, de mayor a menor racha.
    pub alumnos: Vec<StudentStreak>,
}

impl AbsenceStreaks {
    pub fn flagged(&self) -> impl Iterator<Item = &StudentStreak> {
        self.alumnos.iter().filter(|s| s.requiere_seguimiento)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassSummaryRow {
    pub class_id: i64,
    pub nombre: String,
    pub dia: String,
    pub horario: String,
    pub activa: bool,
    pub inscritos: usize,
    pub sesiones: usize,
    pub asistencias: usize,
    pub ultima_sesion: Option<NaiveDate>,
    pub tasa: f64,
}

/// Racha máxima de ABSENT consecutivos. Cualquier otro estado corta la racha.
pub fn max_absence_run<I>(estados: I) -> u32
where
    I: IntoIterator<Item = AttendanceStatus>,
{
    let (mut actual, mut max) = (0u32, 0u32);
    for e in estados {
        if e == AttendanceStatus::Absent {
            actual += 1;
            max = max.max(actual);
        } else {
            actual = 0;
        }
    }
    max
}

impl<'a> Metricas<'a> {
    fn class_label(&self, class_id: Option<i64>, presentes: &HashSet<i64>) -> String {
        if let Some(c) = class_id.and_then(|id| self.data.class(id)) {
            return c.name.clone();
        }
        if presentes.len() == 1 {
            if let Some(c) = presentes.iter().next().and_then(|id| self.data.class(*id)) {
                return c.name.clone();
            }
        }
        "Todas las clases".to_string()
    }

    pub fn daily_list(&self, fecha: NaiveDate, class_id: Option<i64>) -> Result<DailyList, MetricasError> {
        self.ensure_class(class_id)?;
        let siguiente = fecha.succ_opt().unwrap_or(fecha);
        let mut registros = self.data.records_between(fecha, siguiente, class_id);
        registros.sort_by_key(|(r, s)| (s.class_id, s.num_session, r.student_id));

        let clases: HashSet<i64> = self.data.sessions_between(fecha, siguiente, class_id).iter().map(|s| s.class_id).collect();
        let mut lista = DailyList {
            fecha,
            clase: self.class_label(class_id, &clases),
            total: registros.len(),
            presentes: 0,
            tardanzas: 0,
            ausentes: 0,
            justificados: 0,
            sin_registro: 0,
            alumnos: Vec::with_capacity(registros.len()),
        };

        for (r, s) in registros {
            match r.status {
                AttendanceStatus::Present => lista.presentes += 1,
                AttendanceStatus::Tardy => lista.tardanzas += 1,
                AttendanceStatus::Absent => lista.ausentes += 1,
                AttendanceStatus::Justified => lista.justificados += 1,
                AttendanceStatus::Unset => lista.sin_registro += 1,
            }
            let student = self.data.student(r.student_id);
            lista.alumnos.push(DailyRow {
                student_id: r.student_id,
                nombre: student.map(|s| s.name.clone()).unwrap_or_default(),
                apellido: student.map(|s| s.last_name.clone()).unwrap_or_default(),
                genero: student.map(|s| s.genero()).unwrap_or(Genero::NoEspecificado).label().to_string(),
                edad: student.and_then(|s| self.edad_de(s)),
                clase: self.data.class(s.class_id).map(|c| c.name.clone()).unwrap_or_default(),
                num_session: s.num_session,
                estado: r.status.label().to_string(),
            });
        }
        Ok(lista)
    }

    fn attendance_list(&self, etiqueta: String, w: periodo::PeriodWindow, class_id: Option<i64>) -> AttendanceList {
        let alumnos = self.student_metrics(&w, class_id);
        let contar = |e: &str| alumnos.iter().filter(|m| m.estatus == e).count();
        let clase = class_id
            .and_then(|id| self.data.class(id))
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "Todas las clases".to_string());
        AttendanceList {
            etiqueta,
            inicio: w.start,
            fin: w.last_day(),
            clase,
            total_alumnos: alumnos.len(),
            regulares: contar("regular"),
            baja_asistencia: contar("baja asistencia"),
            ausentes: contar("ausente"),
            alumnos,
        }
    }

    /// Semana de 7 días desde `inicio` (por defecto el lunes de la semana actual).
    pub fn weekly_list(&self, inicio: Option<NaiveDate>, class_id: Option<i64>) -> Result<AttendanceList, MetricasError> {
        self.ensure_class(class_id)?;
        let start = inicio.unwrap_or_else(|| periodo::monday_of(self.today));
        let w = periodo::week_window(start);
        Ok(self.attendance_list(format!("Semana del {}", start), w, class_id))
    }

    /// Mes de calendario (por defecto el actual), ordenado por porcentaje descendente.
    pub fn monthly_list(&self, mes: Option<u32>, anio: Option<i32>, class_id: Option<i64>) -> Result<AttendanceList, MetricasError> {
        self.ensure_class(class_id)?;
        let mes = mes.unwrap_or_else(|| self.today.month());
        let anio = anio.unwrap_or_else(|| self.today.year());
        if !(1..=12).contains(&mes) {
            return Err(MetricasError::InvalidInput(format!("mes fuera de rango: {}", mes)));
        }
        let w = periodo::month_window(anio, mes)?;
        let mut lista = self.attendance_list(periodo::month_label(anio, mes), w, class_id);
        lista
            .alumnos
            .sort_by(|a, b| b.porcentaje.total_cmp(&a.porcentaje).then(a.student_id.cmp(&b.student_id)));
        Ok(lista)
    }

    /// Alumnos con ratio estrictamente menor que `umbral`.
    pub fn irregular_students(&self, periodo: &Periodo, umbral: f64) -> IrregularStudents {
        let w = periodo.window(self.today);
        let metricas = self.student_metrics(&w, None);
        let total = metricas.len();
        let alumnos: Vec<StudentMetric> = metricas.into_iter().filter(|m| m.ratio < umbral).collect();
        IrregularStudents {
            periodo: periodo.label(self.today),
            umbral,
            total_considerados: total,
            total_irregulares: alumnos.len(),
            porcentaje: pct(alumnos.len(), total),
            alumnos,
        }
    }

    /// Agrupa a los alumnos activos por sexo o por rango de edad. Todos los
    /// grupos aparecen aunque estén vacíos.
    pub fn group_breakdown(&self, criterio: GroupCriterion, periodo: &Periodo) -> GroupBreakdown {
        let w = periodo.window(self.today);
        let etiquetas: Vec<&'static str> = match criterio {
            GroupCriterion::Genero => Genero::ALL.iter().map(|g| g.label()).collect(),
            GroupCriterion::Edad => RANGOS_EDAD.to_vec(),
        };

        let mut sesiones_por_clase: HashMap<i64, usize> = HashMap::new();
        for s in self.data.sessions_between(w.start, w.end, None) {
            *sesiones_por_clase.entry(s.class_id).or_default() += 1;
        }
        let mut presentes_por_alumno: HashMap<i64, usize> = HashMap::new();
        for (r, _) in self.data.records_between(w.start, w.end, None) {
            if self.is_present(r.status) {
                *presentes_por_alumno.entry(r.student_id).or_default() += 1;
            }
        }

        // grupo -> (alumnos, asistencias, posibles)
        let mut acc: HashMap<&'static str, (usize, usize, usize)> = HashMap::new();
        for s in self.data.students().iter().filter(|s| s.is_active()) {
            let grupo = match criterio {
                GroupCriterion::Genero => s.genero().label(),
                GroupCriterion::Edad => age_bucket(self.edad_de(s)),
            };
            let posibles: usize = self
                .data
                .enrolled_classes(s.id)
                .iter()
                .map(|c| sesiones_por_clase.get(c).copied().unwrap_or(0))
                .sum();
            let e = acc.entry(grupo).or_default();
            e.0 += 1;
            e.1 += presentes_por_alumno.get(&s.id).copied().unwrap_or(0);
            e.2 += posibles;
        }

        let grupos = etiquetas
            .into_iter()
            .map(|g| {
                let (alumnos, asistencias, posibles) = acc.get(g).copied().unwrap_or_default();
                GroupRow { grupo: g.to_string(), alumnos, asistencias, posibles, porcentaje: pct(asistencias, posibles) }
            })
            .collect();

        GroupBreakdown { criterio, periodo: periodo.label(self.today), grupos }
    }

    /// Alumnos activos sin asistencia en más de `dias` días (o que nunca
    /// asistieron). Los que nunca asistieron van primero.
    pub fn inactive_students(&self, dias: i64) -> InactiveStudents {
        let mut ultima: HashMap<i64, NaiveDate> = HashMap::new();
        for (r, s) in self.data.records_with_sessions() {
            if !self.is_present(r.status) || s.day() > self.today {
                continue;
            }
            let e = ultima.entry(r.student_id).or_insert(s.day());
            if s.day() > *e {
                *e = s.day();
            }
        }

        let activos: Vec<_> = self.data.students().iter().filter(|s| s.is_active()).collect();
        let mut alumnos = Vec::new();
        for s in &activos {
            let last = ultima.get(&s.id).copied();
            let dias_inactivo = last.map(|d| (self.today - d).num_days());
            if dias_inactivo.is_some_and(|d| d <= dias) {
                continue;
            }
            let clases = self
                .data
                .enrolled_classes(s.id)
                .iter()
                .filter_map(|c| self.data.class(*c).map(|c| c.name.clone()))
                .collect();
            alumnos.push(InactiveStudent {
                student_id: s.id,
                nombre: s.name.clone(),
                apellido: s.last_name.clone(),
                genero: s.genero().label().to_string(),
                edad: self.edad_de(s),
                ultima_asistencia: last,
                dias_inactivo,
                clases,
            });
        }
        alumnos.sort_by(|a, b| {
            let clave = |x: &InactiveStudent| x.dias_inactivo.unwrap_or(i64::MAX);
            clave(b).cmp(&clave(a)).then(a.student_id.cmp(&b.student_id))
        });

        InactiveStudents { dias_limite: dias, total_activos: activos.len(), total_inactivos: alumnos.len(), alumnos }
    }

    /// Racha máxima de faltas consecutivas por alumno, con registros hasta hoy.
    pub fn absence_streaks(&self, umbral: u32) -> AbsenceStreaks {
        let ids: BTreeSet<i64> = self.data.records_with_sessions().iter().map(|(r, _)| r.student_id).collect();
        let por_alumno: BTreeMap<i64, Vec<AttendanceStatus>> = ids
            .into_iter()
            .map(|id| {
                let estados = self
                    .data
                    .records_of_student(id)
                    .into_iter()
                    .filter(|(_, s)| s.day() <= self.today)
                    .map(|(r, _)| r.status)
                    .collect::<Vec<_>>();
                (id, estados)
            })
            .filter(|(_, estados)| !estados.is_empty())
            .collect();

        let mut alumnos: Vec<StudentStreak> = por_alumno
            .into_iter()
            .map(|(student_id, estados)| {
                let max = max_absence_run(estados);
                let student = self.data.student(student_id);
                StudentStreak {
                    student_id,
                    nombre: student.map(|s| s.name.clone()).unwrap_or_default(),
                    apellido: student.map(|s| s.last_name.clone()).unwrap_or_default(),
                    genero: student.map(|s| s.genero()).unwrap_or(Genero::NoEspecificado).label().to_string(),
                    edad: student.and_then(|s| self.edad_de(s)),
                    max_faltas_consecutivas: max,
                    requiere_seguimiento: max > umbral,
                }
            })
            .collect();
        alumnos.sort_by(|a, b| b.max_faltas_consecutivas.cmp(&a.max_faltas_consecutivas).then(a.student_id.cmp(&b.student_id)));

        AbsenceStreaks {
            umbral,
            total_alumnos: alumnos.len(),
            total_seguimiento: alumnos.iter().filter(|s| s.requiere_seguimiento).count(),
            alumnos,
        }
    }

    /// Resumen histórico por clase: inscritos, sesiones dictadas hasta hoy y
    /// tasa de asistencia sobre inscritos.
    pub fn class_summary(&self) -> Vec<ClassSummaryRow> {
        let mut clases: Vec<_> = self.data.classes().iter().collect();
        clases.sort_by_key(|c| c.id);
        clases
            .into_iter()
            .map(|c| {
                let inscritos = self.data.enrollments().iter().filter(|e| e.class_id == c.id).count();
                let sesiones: Vec<_> = self
                    .data
                    .sessions()
                    .iter()
                    .filter(|s| s.class_id == c.id && s.day() <= self.today)
                    .collect();
                let ids: HashSet<i64> = sesiones.iter().map(|s| s.id).collect();
                let asistencias = self
                    .data
                    .records()
                    .iter()
                    .filter(|r| ids.contains(&r.session_id) && self.is_present(r.status))
                    .count();
                ClassSummaryRow {
                    class_id: c.id,
                    nombre: c.name.clone(),
                    dia: c.day.clone(),
                    horario: c.horario(),
                    activa: c.active,
                    inscritos,
                    sesiones: sesiones.len(),
                    asistencias,
                    ultima_sesion: sesiones.iter().map(|s| s.day()).max(),
                    tasa: pct(asistencias, sesiones.len() * inscritos),
                }
            })
            .collect()
    }
}
