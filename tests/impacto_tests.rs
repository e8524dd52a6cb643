mod test_support;

use metricas::metricas::Periodo;
use metricas::models::AttendanceStatus;
use metricas::MetricsPolicy;
use test_support::{base, contexto, d, dt, Fixture};

#[test]
fn test_tasa_sin_sesiones_es_cero() {
    let data = Fixture::new().student(1, "Ana", Some("F"), None).class(1, "Robótica", "Lunes", true).build();
    let policy = MetricsPolicy::default();
    let m = contexto(&data, &policy);

    let r = m.attendance_rate(&Periodo::Mes, None);
    assert_eq!(r.tasa, 0.0);
    assert_eq!(r.sesiones, 0);
    assert_eq!(r.alumnos, 0);
}

#[test]
fn test_tasa_general_y_por_clase() {
    let data = base().build();
    let policy = MetricsPolicy::default();
    let m = contexto(&data, &policy);

    // 4 presentes / (2 sesiones × 3 alumnos)
    let r = m.attendance_rate(&Periodo::Mes, None);
    assert_eq!(r.asistencias, 4);
    assert_eq!(r.sesiones, 2);
    assert_eq!(r.alumnos, 3);
    assert_eq!(r.tasa, 66.67);
    assert_eq!(r.inicio, d(2024, 5, 1));
    assert_eq!(r.fin, d(2024, 5, 15));

    let clases = m.class_breakdown(&Periodo::Mes);
    assert_eq!(clases.len(), 2);
    assert_eq!(clases[0].nombre, "Robótica");
    assert_eq!(clases[0].tasa, 66.67);
    assert_eq!(clases[0].horario, "15:00 - 17:00");
    assert_eq!(clases[1].sesiones, 0);
    assert_eq!(clases[1].tasa, 0.0);
}

#[test]
fn test_regulares_e_irregulares() {
    let data = base().build();
    let policy = MetricsPolicy::default();
    let m = contexto(&data, &policy);

    let alumnos = m.student_metrics(&Periodo::Mes.window(m.today), None);
    let porcentajes: Vec<f64> = alumnos.iter().map(|a| a.porcentaje).collect();
    assert_eq!(porcentajes, vec![100.0, 100.0, 0.0]);

    let reg = m.regular_students(&Periodo::Mes, 0.5);
    assert_eq!(reg.total_considerados, 3);
    assert_eq!(reg.total_regulares, 2);
    assert_eq!(reg.porcentaje, 66.67);
    assert!(reg.alumnos.iter().all(|a| a.estatus == "regular"));

    let irr = m.irregular_students(&Periodo::Mes, 0.25);
    assert_eq!(irr.total_irregulares, 1);
    assert_eq!(irr.alumnos[0].student_id, 3);
    assert_eq!(irr.alumnos[0].estatus, "ausente");
}

#[test]
fn test_umbral_regular_es_inclusivo() {
    use AttendanceStatus::*;
    // alumno 1 asiste a 1 de 2 sesiones: ratio exactamente 0.5
    let data = Fixture::new()
        .student(1, "Ana", Some("F"), None)
        .class(1, "Robótica", "Lunes", true)
        .enroll(1, 1)
        .session(10, 1, dt(2024, 5, 6, 15))
        .session(11, 1, dt(2024, 5, 13, 15))
        .record(1, 10, Present)
        .record(1, 11, Absent)
        .build();
    let policy = MetricsPolicy::default();
    let m = contexto(&data, &policy);
    assert_eq!(m.regular_students(&Periodo::Mes, 0.5).total_regulares, 1);
    assert_eq!(m.irregular_students(&Periodo::Mes, 0.5).total_irregulares, 0);
}

#[test]
fn test_tardanza_segun_politica() {
    use AttendanceStatus::*;
    let data = Fixture::new()
        .student(1, "Ana", Some("F"), None)
        .class(1, "Robótica", "Lunes", true)
        .enroll(1, 1)
        .session(10, 1, dt(2024, 5, 6, 15))
        .record(1, 10, Tardy)
        .build();

    let estricta = MetricsPolicy::default();
    assert_eq!(contexto(&data, &estricta).attendance_rate(&Periodo::Mes, None).asistencias, 0);

    let tolerante = MetricsPolicy { count_tardy_as_present: true, ..MetricsPolicy::default() };
    let m = contexto(&data, &tolerante);
    assert_eq!(m.attendance_rate(&Periodo::Mes, None).tasa, 100.0);
    assert_eq!(m.frequency_distribution(&Periodo::Mes).bucket_1_3, 1);
}

#[test]
fn test_frecuencia() {
    let data = base().build();
    let policy = MetricsPolicy::default();
    let f = contexto(&data, &policy).frequency_distribution(&Periodo::Mes);

    // el alumno 3 no tiene asistencias y no entra en la distribución
    assert_eq!(f.total_alumnos, 2);
    assert_eq!(f.bucket_1_3, 2);
    assert_eq!(f.bucket_4_5, 0);
    assert_eq!(f.bucket_6_plus, 0);
    assert_eq!(f.distribucion[0].porcentaje, 100.0);
    assert!(f.alumnos.iter().all(|a| a.rango == "1-3 veces"));
}

#[test]
fn test_frecuencia_limites_de_rangos() {
    use AttendanceStatus::*;
    // alumnos 1..=4 asisten 3, 4, 5 y 6 veces; el 5 solo falta y el 6 solo llega tarde
    let mut fixture = Fixture::new().class(1, "Robótica", "Lunes", true);
    for id in 1..=6 {
        fixture = fixture.student(id, "Alumno", None, None);
    }
    for dia in 1..=6u32 {
        let sesion = 20 + dia as i64;
        fixture = fixture.session(sesion, 1, dt(2024, 5, dia, 15));
        for (alumno, presencias) in [(1, 3), (2, 4), (3, 5), (4, 6)] {
            let estado = if dia <= presencias { Present } else { Absent };
            fixture = fixture.record(alumno, sesion, estado);
        }
        fixture = fixture.record(5, sesion, Absent).record(6, sesion, Tardy);
    }
    let data = fixture.build();
    let policy = MetricsPolicy::default();
    let f = contexto(&data, &policy).frequency_distribution(&Periodo::Mes);

    assert_eq!(f.bucket_1_3, 1);
    assert_eq!(f.bucket_4_5, 2);
    assert_eq!(f.bucket_6_plus, 1);
    // solo cuentan los alumnos con al menos un registro presente
    assert_eq!(f.total_alumnos, 4);
    assert_eq!(f.bucket_1_3 + f.bucket_4_5 + f.bucket_6_plus, f.total_alumnos);
    let rangos: Vec<(i64, usize, &str)> = f.alumnos.iter().map(|a| (a.student_id, a.asistencias, a.rango.as_str())).collect();
    assert_eq!(
        rangos,
        vec![(1, 3, "1-3 veces"), (2, 4, "4-5 veces"), (3, 5, "4-5 veces"), (4, 6, "6 o más veces")]
    );
    assert_eq!(f.distribucion[1].porcentaje, 50.0);

    // con tardanzas como presentes el alumno 6 entra en 6 o más
    let policy = MetricsPolicy { count_tardy_as_present: true, ..MetricsPolicy::default() };
    let f = contexto(&data, &policy).frequency_distribution(&Periodo::Mes);
    assert_eq!(f.bucket_6_plus, 2);
    assert_eq!(f.total_alumnos, 5);
}

#[test]
fn test_retencion_sin_mes_anterior() {
    let data = base().build();
    let policy = MetricsPolicy::default();
    let meses = contexto(&data, &policy).retention(2);

    assert_eq!(meses.len(), 2);
    assert_eq!((meses[0].anio, meses[0].mes), (2024, 5));
    assert_eq!(meses[0].etiqueta, "mayo 2024");
    assert_eq!(meses[0].total_alumnos, 2);
    assert_eq!(meses[0].nuevos, 2);
    assert_eq!(meses[0].tasa_retencion, 0.0);
    assert_eq!((meses[1].anio, meses[1].mes), (2024, 4));
    assert_eq!(meses[1].total_alumnos, 0);
}

#[test]
fn test_retencion_entre_meses() {
    use AttendanceStatus::*;
    let data = base()
        .session(9, 1, dt(2024, 4, 29, 15))
        .record(1, 9, Present)
        .record(3, 9, Present)
        .build();
    let policy = MetricsPolicy::default();
    let mayo = &contexto(&data, &policy).retention(1)[0];

    // abril: {1, 3}; mayo: {1, 2}
    assert_eq!(mayo.total_mes_anterior, 2);
    assert_eq!(mayo.retenidos, 1);
    assert_eq!(mayo.nuevos, 1);
    assert_eq!(mayo.tasa_retencion, 50.0);
}

#[test]
fn test_dia_mayor_empate_gana_lunes() {
    use AttendanceStatus::*;
    let data = Fixture::new()
        .student(1, "Ana", Some("F"), None)
        .class(1, "Robótica", "Lunes", true)
        .class(2, "Arte", "Martes", true)
        .session(10, 1, dt(2024, 5, 13, 15))
        .session(20, 2, dt(2024, 5, 14, 15))
        .record(1, 20, Present)
        .record(1, 10, Present)
        .build();
    let policy = MetricsPolicy::default();
    let b = contexto(&data, &policy).busiest_weekday(&Periodo::Semana);

    assert_eq!(b.dia_mayor.as_deref(), Some("Lunes"));
    assert_eq!(b.conteos.len(), 7);
    assert!(b.conteos[0].es_mayor);
    assert!(!b.conteos[1].es_mayor);
    assert_eq!(b.conteos[1].asistencias, 1);
}

#[test]
fn test_dia_mayor_sin_asistencias() {
    let data = Fixture::new().build();
    let policy = MetricsPolicy::default();
    let b = contexto(&data, &policy).busiest_weekday(&Periodo::Mes);
    assert_eq!(b.dia_mayor, None);
    assert!(b.conteos.iter().all(|c| c.asistencias == 0 && !c.es_mayor));
}

#[test]
fn test_promedio_sesiones() {
    let data = base().build();
    let policy = MetricsPolicy::default();
    let a = contexto(&data, &policy).average_sessions(&Periodo::Mes);

    // 4 asistencias / 3 alumnos con registro
    assert_eq!(a.total_asistencias, 4);
    assert_eq!(a.total_alumnos, 3);
    assert_eq!(a.promedio, 1.33);
}
