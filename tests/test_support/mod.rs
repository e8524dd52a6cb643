// Datos de prueba compartidos por los tests de integración.
#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use metricas::models::{
    AttendanceRecord, AttendanceStatus, ClassSection, Dataset, Enrollment, Session, Student, StudentStatus,
};
use metricas::{Metricas, MetricsPolicy};

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).expect("fecha válida")
}

pub fn dt(y: i32, m: u32, day: u32, h: u32) -> NaiveDateTime {
    d(y, m, day).and_hms_opt(h, 0, 0).expect("hora válida")
}

/// Miércoles 15 de mayo de 2024.
pub fn hoy() -> NaiveDate {
    d(2024, 5, 15)
}

#[derive(Default)]
pub struct Fixture {
    students: Vec<Student>,
    classes: Vec<ClassSection>,
    sessions: Vec<Session>,
    records: Vec<AttendanceRecord>,
    enrollments: Vec<Enrollment>,
}

impl Fixture {
    pub fn new() -> Self {
        Fixture::default()
    }

    pub fn student(mut self, id: i64, name: &str, gender: Option<&str>, birthdate: Option<NaiveDate>) -> Self {
        self.students.push(Student {
            id,
            name: name.to_string(),
            last_name: format!("Apellido{}", id),
            gender: gender.map(str::to_string),
            birthdate,
            status: StudentStatus::Active,
        });
        self
    }

    pub fn inactive_student(mut self, id: i64, name: &str, gender: Option<&str>) -> Self {
        self = self.student(id, name, gender, None);
        if let Some(s) = self.students.last_mut() {
            s.status = StudentStatus::Inactive;
        }
        self
    }

    pub fn class(mut self, id: i64, name: &str, day: &str, active: bool) -> Self {
        self.classes.push(ClassSection {
            id,
            name: name.to_string(),
            day: day.to_string(),
            start_time: NaiveTime::from_hms_opt(15, 0, 0),
            end_time: NaiveTime::from_hms_opt(17, 0, 0),
            active,
        });
        self
    }

    pub fn session(mut self, id: i64, class_id: i64, date: NaiveDateTime) -> Self {
        let num_session = self.sessions.iter().filter(|s| s.class_id == class_id).count() as i64 + 1;
        self.sessions.push(Session { id, class_id, num_session, date });
        self
    }

    pub fn record(mut self, student_id: i64, session_id: i64, status: AttendanceStatus) -> Self {
        let id = self.records.len() as i64 + 1;
        self.records.push(AttendanceRecord { id, student_id, session_id, volunteer_id: None, status, created: None });
        self
    }

    pub fn enroll(mut self, student_id: i64, class_id: i64) -> Self {
        self.enrollments.push(Enrollment { student_id, class_id });
        self
    }

    pub fn build(self) -> Dataset {
        Dataset::new(self.students, self.classes, self.sessions, self.records, self.enrollments)
    }
}

/// Escenario base:
/// - clase 1 "Robótica" (lunes) con sesiones el 6 y el 13 de mayo de 2024
/// - clase 2 "Arte" (miércoles) sin sesiones
/// - alumnos 1 y 2 asisten a ambas sesiones, el 3 falta a las dos
/// - alumno 4 inactivo, alumno 5 inscrito en Arte sin registros
pub fn base() -> Fixture {
    use AttendanceStatus::*;
    Fixture::new()
        .student(1, "Ana", Some("F"), Some(d(2010, 5, 15)))
        .student(2, "Luis", Some("M"), Some(d(2012, 1, 10)))
        .student(3, "Sofía", Some("Femenino"), None)
        .inactive_student(4, "Pedro", Some("M"))
        .student(5, "Carla", None, None)
        .class(1, "Robótica", "Lunes", true)
        .class(2, "Arte", "Miércoles", true)
        .enroll(1, 1)
        .enroll(2, 1)
        .enroll(3, 1)
        .enroll(5, 2)
        .session(10, 1, dt(2024, 5, 6, 15))
        .session(11, 1, dt(2024, 5, 13, 15))
        .record(1, 10, Present)
        .record(1, 11, Present)
        .record(2, 10, Present)
        .record(2, 11, Present)
        .record(3, 10, Absent)
        .record(3, 11, Absent)
}

pub fn contexto<'a>(data: &'a Dataset, policy: &'a MetricsPolicy) -> Metricas<'a> {
    Metricas::new(data, policy, hoy())
}
