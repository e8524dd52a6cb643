mod test_support;

use std::path::PathBuf;

use metricas::config::StoreConfig;
use metricas::metricas::Periodo;
use metricas::models::{AttendanceStatus, StudentStatus};
use metricas::store::{open_store, AttendanceStore, SqliteStore};
use metricas::{MetricasError, Metricas, MetricsPolicy};
use test_support::{d, dt};

fn temp_db(nombre: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("metricas_{}_{}.db", nombre, std::process::id()));
    let _ = std::fs::remove_file(&path);
    path
}

#[test]
fn test_numeracion_de_sesiones() {
    let path = temp_db("sesiones");
    let store = SqliteStore::new(&path);
    store.init_schema().expect("Debe crear el esquema");

    let clase = store.insert_class("Robótica", "Lunes", None, None, true).unwrap();
    let s1 = store.create_session(clase, dt(2024, 5, 6, 15)).unwrap();
    let s2 = store.create_session(clase, dt(2024, 5, 13, 15)).unwrap();
    assert_eq!(s1.num_session, 1);
    assert_eq!(s2.num_session, 2);

    let otra = store.insert_class("Arte", "Miércoles", None, None, true).unwrap();
    assert_eq!(store.create_session(otra, dt(2024, 5, 8, 15)).unwrap().num_session, 1);

    let err = store.create_session(999, dt(2024, 5, 8, 15)).unwrap_err();
    assert!(matches!(err, MetricasError::NotFound(_)));

    let data = store.snapshot().unwrap();
    assert_eq!(data.next_session_number(clase), 3);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_snapshot_y_metricas() {
    let path = temp_db("snapshot");
    let store = SqliteStore::new(&path);
    store.init_schema().unwrap();
    // init_schema es idempotente
    store.init_schema().unwrap();

    let ana = store.insert_student("Ana", "Pérez", Some("F"), Some(d(2010, 5, 15)), StudentStatus::Active).unwrap();
    let luis = store.insert_student("Luis", "Soto", Some("M"), None, StudentStatus::Active).unwrap();
    let clase = store.insert_class("Robótica", "Lunes", None, None, true).unwrap();
    store.enroll(ana, clase).unwrap();
    store.enroll(luis, clase).unwrap();
    store.enroll(luis, clase).unwrap();

    let s1 = store.create_session(clase, dt(2024, 5, 6, 15)).unwrap();
    let s2 = store.create_session(clase, dt(2024, 5, 13, 15)).unwrap();
    store.record_attendance(ana, s1.id, AttendanceStatus::Present, Some(7)).unwrap();
    store.record_attendance(ana, s2.id, AttendanceStatus::Present, None).unwrap();
    store.record_attendance(luis, s1.id, AttendanceStatus::Absent, None).unwrap();
    store.record_attendance(luis, s2.id, AttendanceStatus::Unset, None).unwrap();

    let data = store.snapshot().expect("Debe leer la instantánea");
    assert_eq!(data.students().len(), 2);
    assert_eq!(data.enrollments().len(), 2);
    assert_eq!(data.sessions().len(), 2);
    assert_eq!(data.records().len(), 4);
    assert_eq!(data.student(ana).unwrap().birthdate, Some(d(2010, 5, 15)));
    assert_eq!(data.records()[0].volunteer_id, Some(7));
    assert_eq!(data.records()[3].status, AttendanceStatus::Unset);

    let policy = MetricsPolicy::default();
    let m = Metricas::new(&data, &policy, d(2024, 5, 15));
    let r = m.attendance_rate(&Periodo::Mes, Some(clase));
    assert_eq!(r.asistencias, 2);
    assert_eq!(r.tasa, 50.0);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_open_store_crea_directorio() {
    let dir = std::env::temp_dir().join(format!("metricas_dir_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    let path = dir.join("nested").join("asistencia.db");

    let store = open_store(&StoreConfig::Sqlite(path.clone())).expect("Debe abrir el almacén");
    assert_eq!(store.backend(), "sqlite");
    assert!(path.exists());
    assert!(store.snapshot().unwrap().students().is_empty());

    let _ = std::fs::remove_dir_all(&dir);
}
