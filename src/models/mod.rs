// Estructuras de datos principales (entradas de solo lectura para las métricas)

use std::collections::{BTreeSet, HashMap};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::MetricasError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudentStatus {
    Active,
    Inactive,
}

impl StudentStatus {
    /// La base guarda 1 = activo, cualquier otro valor = inactivo.
    pub fn from_flag(flag: i64) -> Self {
        if flag == 1 { StudentStatus::Active } else { StudentStatus::Inactive }
    }

    pub fn as_flag(self) -> i64 {
        match self {
            StudentStatus::Active => 1,
            StudentStatus::Inactive => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub last_name: String,
    pub gender: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub status: StudentStatus,
}

impl Student {
    pub fn is_active(&self) -> bool {
        self.status == StudentStatus::Active
    }

    pub fn genero(&self) -> Genero {
        Genero::from_raw(self.gender.as_deref())
    }
}

/// Género normalizado. En los datos conviven "M"/"F" y "Masculino"/"Femenino".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Genero {
    Masculino,
    Femenino,
    Otro,
    NoEspecificado,
}

impl Genero {
    pub fn from_raw(raw: Option<&str>) -> Self {
        let Some(raw) = raw else { return Genero::NoEspecificado };
        match raw.trim().to_lowercase().as_str() {
            "" => Genero::NoEspecificado,
            "m" | "masculino" | "male" | "hombre" => Genero::Masculino,
            "f" | "femenino" | "female" | "mujer" => Genero::Femenino,
            _ => Genero::Otro,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Genero::Masculino => "Masculino",
            Genero::Femenino => "Femenino",
            Genero::Otro => "Otro",
            Genero::NoEspecificado => "No especificado",
        }
    }

    pub const ALL: [Genero; 4] = [Genero::Masculino, Genero::Femenino, Genero::Otro, Genero::NoEspecificado];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassSection {
    pub id: i64,
    pub name: String,
    /// Día de la semana tal como lo guarda el CRUD ("Lunes", "Martes"...)
    pub day: String,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub active: bool,
}

impl ClassSection {
    /// "HH:MM - HH:MM", o cadena vacía si falta alguno de los extremos.
    pub fn horario(&self) -> String {
        match (self.start_time, self.end_time) {
            (Some(s), Some(e)) => format!("{} - {}", s.format("%H:%M"), e.format("%H:%M")),
            _ => String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub class_id: i64,
    pub num_session: i64,
    pub date: NaiveDateTime,
}

impl Session {
    pub fn day(&self) -> NaiveDate {
        self.date.date()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Tardy,
    Absent,
    Justified,
    Unset,
}

impl AttendanceStatus {
    /// Parseo estricto de los códigos que acepta el CRUD. También se aceptan
    /// los códigos heredados ONTIME / LATE / FAIL.
    pub fn parse(code: &str) -> Result<Self, MetricasError> {
        match code.trim().to_uppercase().as_str() {
            "PRESENT" | "ONTIME" => Ok(AttendanceStatus::Present),
            "TARDY" | "LATE" => Ok(AttendanceStatus::Tardy),
            "ABSENT" | "FAIL" => Ok(AttendanceStatus::Absent),
            "JUSTIFIED" => Ok(AttendanceStatus::Justified),
            "" => Ok(AttendanceStatus::Unset),
            other => Err(MetricasError::InvalidInput(format!("estado de asistencia desconocido: {}", other))),
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "PRESENT",
            AttendanceStatus::Tardy => "TARDY",
            AttendanceStatus::Absent => "ABSENT",
            AttendanceStatus::Justified => "JUSTIFIED",
            AttendanceStatus::Unset => "",
        }
    }

    /// Etiqueta para listas y reportes; el estado vacío se muestra como "No registrada".
    pub fn label(self) -> &'static str {
        match self {
            AttendanceStatus::Unset => "No registrada",
            other => other.code(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: i64,
    pub student_id: i64,
    pub session_id: i64,
    pub volunteer_id: Option<i64>,
    pub status: AttendanceStatus,
    pub created: Option<NaiveDateTime>,
}

/// Inscripción alumno-clase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub student_id: i64,
    pub class_id: i64,
}

/// Parsea fechas-hora en los formatos que guarda el CRUD. Una fecha sola se
/// interpreta a medianoche.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let t = s.trim();
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(t, fmt) {
            return Some(dt);
        }
    }
    // timestamps con zona horaria (postgres ::text) -> se descarta el offset
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(t) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = chrono::DateTime::parse_from_str(t, "%Y-%m-%d %H:%M:%S%#z") {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = chrono::DateTime::parse_from_str(t, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.naive_local());
    }
    parse_date(t).and_then(|d| d.and_hms_opt(0, 0, 0))
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

pub fn parse_time(s: &str) -> Option<NaiveTime> {
    let t = s.trim();
    NaiveTime::parse_from_str(t, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(t, "%H:%M"))
        .ok()
}

/// Instantánea de solo lectura del almacén de asistencia.
///
/// Mantiene índices por id para que las consultas filtradas (por ventana de
/// fechas, por clase, por alumno) no recorran los vectores completos.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    students: Vec<Student>,
    classes: Vec<ClassSection>,
    sessions: Vec<Session>,
    records: Vec<AttendanceRecord>,
    enrollments: Vec<Enrollment>,
    student_idx: HashMap<i64, usize>,
    class_idx: HashMap<i64, usize>,
    session_idx: HashMap<i64, usize>,
}

impl Dataset {
    pub fn new(
        students: Vec<Student>,
        classes: Vec<ClassSection>,
        sessions: Vec<Session>,
        records: Vec<AttendanceRecord>,
        enrollments: Vec<Enrollment>,
    ) -> Self {
        let student_idx = students.iter().enumerate().map(|(i, s)| (s.id, i)).collect();
        let class_idx = classes.iter().enumerate().map(|(i, c)| (c.id, i)).collect();
        let session_idx = sessions.iter().enumerate().map(|(i, s)| (s.id, i)).collect();
        Dataset { students, classes, sessions, records, enrollments, student_idx, class_idx, session_idx }
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn classes(&self) -> &[ClassSection] {
        &self.classes
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn records(&self) -> &[AttendanceRecord] {
        &self.records
    }

    pub fn enrollments(&self) -> &[Enrollment] {
        &self.enrollments
    }

    pub fn student(&self, id: i64) -> Option<&Student> {
        self.student_idx.get(&id).map(|&i| &self.students[i])
    }

    pub fn class(&self, id: i64) -> Option<&ClassSection> {
        self.class_idx.get(&id).map(|&i| &self.classes[i])
    }

    pub fn session(&self, id: i64) -> Option<&Session> {
        self.session_idx.get(&id).map(|&i| &self.sessions[i])
    }

    /// Sesiones con fecha en `[start, end)`, opcionalmente de una sola clase.
    pub fn sessions_between(&self, start: NaiveDate, end: NaiveDate, class_id: Option<i64>) -> Vec<&Session> {
        self.sessions
            .iter()
            .filter(|s| s.day() >= start && s.day() < end)
            .filter(|s| class_id.is_none_or(|c| s.class_id == c))
            .collect()
    }

    /// Registros cuya sesión cae en `[start, end)`, junto con su sesión.
    /// Los registros que apuntan a sesiones inexistentes se ignoran.
    pub fn records_between(&self, start: NaiveDate, end: NaiveDate, class_id: Option<i64>) -> Vec<(&AttendanceRecord, &Session)> {
        self.records
            .iter()
            .filter_map(|r| self.session(r.session_id).map(|s| (r, s)))
            .filter(|(_, s)| s.day() >= start && s.day() < end)
            .filter(|(_, s)| class_id.is_none_or(|c| s.class_id == c))
            .collect()
    }

    /// Registros con su sesión, sin filtro de fechas.
    pub fn records_with_sessions(&self) -> Vec<(&AttendanceRecord, &Session)> {
        self.records
            .iter()
            .filter_map(|r| self.session(r.session_id).map(|s| (r, s)))
            .collect()
    }

    /// Registros de un alumno ordenados por fecha de sesión.
    pub fn records_of_student(&self, student_id: i64) -> Vec<(&AttendanceRecord, &Session)> {
        let mut out: Vec<_> = self
            .records_with_sessions()
            .into_iter()
            .filter(|(r, _)| r.student_id == student_id)
            .collect();
        out.sort_by_key(|(_, s)| (s.date, s.id));
        out
    }

    /// Clases en las que el alumno está inscrito.
    pub fn enrolled_classes(&self, student_id: i64) -> BTreeSet<i64> {
        self.enrollments
            .iter()
            .filter(|e| e.student_id == student_id)
            .map(|e| e.class_id)
            .collect()
    }

    /// Siguiente `num_session` para la clase: `max(existentes) + 1`, empezando en 1.
    pub fn next_session_number(&self, class_id: i64) -> i64 {
        self.sessions
            .iter()
            .filter(|s| s.class_id == class_id)
            .map(|s| s.num_session)
            .max()
            .unwrap_or(0)
            + 1
    }
}
