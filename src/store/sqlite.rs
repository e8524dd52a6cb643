use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::{class_from_row, record_from_row, session_from_row, student_from_row, AttendanceStore};
use crate::error::MetricasError;
use crate::models::{AttendanceStatus, Dataset, Enrollment, Session, StudentStatus};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS students (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        last_name TEXT NOT NULL DEFAULT '',
        gender TEXT,
        birthdate TEXT,
        status INTEGER NOT NULL DEFAULT 1
    );
    CREATE TABLE IF NOT EXISTS classes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        day TEXT,
        start_time TEXT,
        end_time TEXT,
        status INTEGER NOT NULL DEFAULT 1
    );
    CREATE TABLE IF NOT EXISTS sessions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        class_id INTEGER NOT NULL REFERENCES classes(id),
        num_session INTEGER NOT NULL,
        date TEXT NOT NULL,
        UNIQUE (class_id, num_session)
    );
    CREATE TABLE IF NOT EXISTS attendance (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        student_id INTEGER NOT NULL REFERENCES students(id),
        session_id INTEGER NOT NULL REFERENCES sessions(id),
        volunteer_id INTEGER,
        attendance TEXT NOT NULL DEFAULT '',
        created TEXT
    );
    CREATE TABLE IF NOT EXISTS student_classes (
        student_id INTEGER NOT NULL REFERENCES students(id),
        class_id INTEGER NOT NULL REFERENCES classes(id),
        PRIMARY KEY (student_id, class_id)
    );
";

/// Almacén SQLite. Abre una conexión corta por operación.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        SqliteStore { path: path.as_ref().to_path_buf() }
    }

    fn open(&self) -> Result<Connection, MetricasError> {
        Ok(Connection::open(&self.path)?)
    }

    /// Crea el directorio y las tablas si no existen.
    pub fn init_schema(&self) -> Result<(), MetricasError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)
                    .map_err(|e| MetricasError::Config(format!("no se pudo crear {}: {}", dir.display(), e)))?;
            }
        }
        let conn = self.open()?;
        conn.execute_batch(SCHEMA)?;
        info!(path = %self.path.display(), "esquema sqlite listo");
        Ok(())
    }

    pub fn insert_student(
        &self,
        name: &str,
        last_name: &str,
        gender: Option<&str>,
        birthdate: Option<NaiveDate>,
        status: StudentStatus,
    ) -> Result<i64, MetricasError> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO students (name, last_name, gender, birthdate, status) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![name, last_name, gender, birthdate.map(|d| d.format("%Y-%m-%d").to_string()), status.as_flag()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_class(
        &self,
        name: &str,
        day: &str,
        start_time: Option<NaiveTime>,
        end_time: Option<NaiveTime>,
        active: bool,
    ) -> Result<i64, MetricasError> {
        let fmt = |t: Option<NaiveTime>| t.map(|t| t.format("%H:%M:%S").to_string());
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO classes (name, day, start_time, end_time, status) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![name, day, fmt(start_time), fmt(end_time), if active { 1 } else { 0 }],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn enroll(&self, student_id: i64, class_id: i64) -> Result<(), MetricasError> {
        let conn = self.open()?;
        conn.execute(
            "INSERT OR IGNORE INTO student_classes (student_id, class_id) VALUES (?1, ?2)",
            params![student_id, class_id],
        )?;
        Ok(())
    }

    /// Crea una sesión con `num_session = max + 1` dentro de una transacción.
    pub fn create_session(&self, class_id: i64, date: NaiveDateTime) -> Result<Session, MetricasError> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        let exists: Option<i64> = tx
            .query_row("SELECT id FROM classes WHERE id = ?1", params![class_id], |r| r.get(0))
            .optional()?;
        if exists.is_none() {
            return Err(MetricasError::NotFound(format!("clase {}", class_id)));
        }
        let next: i64 = tx.query_row(
            "SELECT COALESCE(MAX(num_session), 0) + 1 FROM sessions WHERE class_id = ?1",
            params![class_id],
            |r| r.get(0),
        )?;
        tx.execute(
            "INSERT INTO sessions (class_id, num_session, date) VALUES (?1, ?2, ?3)",
            params![class_id, next, date.format("%Y-%m-%d %H:%M:%S").to_string()],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        debug!(class_id, num_session = next, "sesión creada");
        Ok(Session { id, class_id, num_session: next, date })
    }

    pub fn record_attendance(
        &self,
        student_id: i64,
        session_id: i64,
        status: AttendanceStatus,
        volunteer_id: Option<i64>,
    ) -> Result<i64, MetricasError> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO attendance (student_id, session_id, volunteer_id, attendance, created)
             VALUES (?1, ?2, ?3, ?4, datetime('now'))",
            params![student_id, session_id, volunteer_id, status.code()],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

impl AttendanceStore for SqliteStore {
    fn snapshot(&self) -> Result<Dataset, MetricasError> {
        let conn = self.open()?;

        let mut stmt = conn.prepare("SELECT id, name, last_name, gender, birthdate, status FROM students ORDER BY id")?;
        let students = stmt
            .query_map([], |r| Ok(student_from_row(r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare("SELECT id, name, day, start_time, end_time, status FROM classes ORDER BY id")?;
        let classes = stmt
            .query_map([], |r| Ok(class_from_row(r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare("SELECT id, class_id, num_session, date FROM sessions ORDER BY id")?;
        let rows = stmt
            .query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, i64>(1)?, r.get::<_, i64>(2)?, r.get::<_, String>(3)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        let sessions = rows
            .into_iter()
            .filter_map(|(id, class_id, num, date)| session_from_row(id, class_id, num, &date))
            .collect();

        let mut stmt = conn.prepare(
            "SELECT id, student_id, session_id, volunteer_id, attendance, created FROM attendance ORDER BY id",
        )?;
        let records = stmt
            .query_map([], |r| Ok(record_from_row(r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare("SELECT student_id, class_id FROM student_classes")?;
        let enrollments = stmt
            .query_map([], |r| Ok(Enrollment { student_id: r.get(0)?, class_id: r.get(1)? }))?
            .collect::<Result<Vec<_>, _>>()?;

        let data = Dataset::new(students, classes, sessions, records, enrollments);
        debug!(
            students = data.students().len(),
            sessions = data.sessions().len(),
            records = data.records().len(),
            "snapshot sqlite"
        );
        Ok(data)
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}
