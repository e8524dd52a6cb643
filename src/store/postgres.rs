use ::postgres::{Client, NoTls};
use tracing::debug;

use super::{class_from_row, record_from_row, session_from_row, student_from_row, AttendanceStore};
use crate::error::MetricasError;
use crate::models::{Dataset, Enrollment};

/// Almacén Postgres. Solo guarda la URL: cada snapshot se hace en un hilo
/// aparte con el cliente síncrono, para no arrancar un runtime dentro del de
/// actix.
#[derive(Clone)]
pub struct PostgresStore {
    url: String,
}

impl std::fmt::Debug for PostgresStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PostgresStore(..)")
    }
}

impl PostgresStore {
    pub fn new(url: String) -> Self {
        PostgresStore { url }
    }
}

fn load(url: &str) -> Result<Dataset, MetricasError> {
    let mut client = Client::connect(url, NoTls)?;

    let students = client
        .query(
            "SELECT id::bigint, name, COALESCE(last_name, ''), gender, birthdate::text, status::bigint
             FROM students ORDER BY id",
            &[],
        )?
        .iter()
        .map(|r| student_from_row(r.get(0), r.get(1), r.get(2), r.get(3), r.get(4), r.get(5)))
        .collect();

    let classes = client
        .query(
            "SELECT id::bigint, name, day::text, start_time::text, end_time::text, status::bigint
             FROM classes ORDER BY id",
            &[],
        )?
        .iter()
        .map(|r| class_from_row(r.get(0), r.get(1), r.get(2), r.get(3), r.get(4), r.get(5)))
        .collect();

    let sessions = client
        .query("SELECT id::bigint, class_id::bigint, num_session::bigint, date::text FROM sessions ORDER BY id", &[])?
        .iter()
        .filter_map(|r| {
            let date: String = r.get(3);
            session_from_row(r.get(0), r.get(1), r.get(2), &date)
        })
        .collect();

    let records = client
        .query(
            "SELECT id::bigint, student_id::bigint, session_id::bigint, volunteer_id::bigint, attendance, created::text
             FROM attendance ORDER BY id",
            &[],
        )?
        .iter()
        .map(|r| record_from_row(r.get(0), r.get(1), r.get(2), r.get(3), r.get(4), r.get(5)))
        .collect();

    let enrollments = client
        .query("SELECT student_id::bigint, class_id::bigint FROM student_classes", &[])?
        .iter()
        .map(|r| Enrollment { student_id: r.get(0), class_id: r.get(1) })
        .collect();

    Ok(Dataset::new(students, classes, sessions, records, enrollments))
}

impl AttendanceStore for PostgresStore {
    fn snapshot(&self) -> Result<Dataset, MetricasError> {
        let url = self.url.clone();
        let handle = std::thread::spawn(move || load(&url));
        match handle.join() {
            Ok(res) => {
                if let Ok(data) = &res {
                    debug!(students = data.students().len(), records = data.records().len(), "snapshot postgres");
                }
                res
            }
            Err(e) => Err(MetricasError::Postgres(format!("thread join error: {:?}", e))),
        }
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
