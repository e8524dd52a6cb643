mod test_support;

use metricas::excel::{decode_workbook, encode_workbook};
use metricas::reporte::gestion::{HOJA_DIARIA, HOJA_FALTAS};
use metricas::reporte::impacto::HOJAS_IMPACTO;
use metricas::reporte::{
    generate_impact_report, generate_management_report, impact_sections, CellValue, ImpactParams, ManagementParams,
    ReportSection,
};
use metricas::{MetricasError, MetricsPolicy};
use test_support::{base, contexto, d};

#[test]
fn test_seccion_ida_y_vuelta() {
    let mut s = ReportSection::new("Tasa de Asistencia")
        .summary("Periodo", "mes")
        .summary("Valor", 42.5)
        .summary("Desde", d(2024, 5, 1))
        .columns(&[("id", "ID"), ("nombre", "Nombre"), ("fecha", "Fecha"), ("nota", "Nota")]);
    s.push_row(vec![1usize.into(), "Ana".into(), d(2024, 5, 13).into(), CellValue::Empty]);
    s.push_row(vec![2usize.into(), "Luis".into(), CellValue::Empty, 3.75f64.into()]);

    let buf = encode_workbook(std::slice::from_ref(&s)).expect("Debe codificar el libro");
    let leidas = decode_workbook(&buf).expect("Debe decodificar el libro");

    assert_eq!(leidas.len(), 1);
    let r = &leidas[0];
    assert_eq!(r.sheet_name, "Tasa de Asistencia");
    assert_eq!(r.summary, s.summary);
    assert_eq!(r.headers(), vec!["ID", "Nombre", "Fecha", "Nota"]);
    assert_eq!(r.rows, s.rows);
}

#[test]
fn test_seccion_solo_resumen() {
    let s = ReportSection::new("Resumen").summary("Total", 3usize);
    let buf = encode_workbook(&[s]).unwrap();
    let leidas = decode_workbook(&buf).unwrap();
    assert!(leidas[0].columns.is_empty());
    assert!(leidas[0].rows.is_empty());
    assert_eq!(leidas[0].summary[0].value, CellValue::Number(3.0));
}

#[test]
fn test_numero_no_finito_no_genera_buffer() {
    let s = ReportSection::new("Tasa").summary("Tasa", f64::INFINITY);
    assert!(matches!(encode_workbook(&[s]), Err(MetricasError::Encoder(_))));
}

#[test]
fn test_bytes_invalidos_no_decodifican() {
    assert!(matches!(decode_workbook(b"no es un xlsx"), Err(MetricasError::Decoder(_))));
}

#[test]
fn test_reporte_impacto_orden_de_hojas() {
    let data = base().build();
    let policy = MetricsPolicy::default();
    let m = contexto(&data, &policy);
    let params = ImpactParams::from_policy(&policy);

    let buf = generate_impact_report(&m, &params).expect("Debe generar el reporte de impacto");
    let hojas = decode_workbook(&buf).unwrap();
    let nombres: Vec<&str> = hojas.iter().map(|h| h.sheet_name.as_str()).collect();
    assert_eq!(nombres, HOJAS_IMPACTO.to_vec());

    let regulares = &hojas[1];
    let total = regulares.summary.iter().find(|r| r.label.starts_with("Total Alumnos Regulares")).unwrap();
    assert_eq!(total.value, CellValue::Number(2.0));
    assert_eq!(regulares.rows.len(), 2);
}

#[test]
fn test_reporte_impacto_clase_inexistente() {
    let data = base().build();
    let policy = MetricsPolicy::default();
    let m = contexto(&data, &policy);
    let params = ImpactParams { class_id: Some(99), ..ImpactParams::from_policy(&policy) };

    let secciones = impact_sections(&m, &params);
    assert_eq!(secciones.len(), 6);
    assert_eq!(secciones[0].summary[0].label, "Error");
    // el resto de las hojas se genera igual
    assert_ne!(secciones[1].summary[0].label, "Error");
}

#[test]
fn test_reporte_gestion_orden_de_hojas() {
    let data = base().build();
    let policy = MetricsPolicy::default();
    let m = contexto(&data, &policy);
    let params = ManagementParams::from_policy(&policy);

    let buf = generate_management_report(&m, &params).expect("Debe generar el reporte de gestión");
    let hojas = decode_workbook(&buf).unwrap();
    let nombres: Vec<&str> = hojas.iter().map(|h| h.sheet_name.as_str()).collect();
    assert_eq!(
        nombres,
        vec![
            "Lista Asistencia Diaria",
            "Lista Asistencia Semanal",
            "Lista Asistencia Mensual",
            "Alumnos Irregulares",
            "Grupos por Sexo",
            "Más de 30 Faltas Seguidas",
            "Alumnos Inactivos",
            "Resumen por Clases",
        ]
    );

    let inactivos = &hojas[6];
    assert_eq!(inactivos.rows.len(), 2);
    assert_eq!(inactivos.rows[0][1], CellValue::Text("Sofía".into()));
}

#[test]
fn test_reporte_gestion_con_error_conserva_hojas() {
    let data = base().build();
    let policy = MetricsPolicy::default();
    let m = contexto(&data, &policy);
    let params = ManagementParams { class_id: Some(99), ..ManagementParams::from_policy(&policy) };

    let buf = generate_management_report(&m, &params).expect("Un error de sección no aborta el reporte");
    let hojas = decode_workbook(&buf).unwrap();
    assert_eq!(hojas.len(), 8);
    assert_eq!(hojas[0].sheet_name, HOJA_DIARIA);
    assert_eq!(hojas[0].summary[0].label, "Error");
    assert!(matches!(&hojas[0].summary[0].value, CellValue::Text(t) if t.contains("99")));
}

#[test]
fn test_reporte_gestion_umbral_de_faltas_enorme() {
    let data = base().build();
    let policy = MetricsPolicy::default();
    let m = contexto(&data, &policy);
    let params = ManagementParams { streak_threshold: 100_000_000, ..ManagementParams::from_policy(&policy) };

    let buf = generate_management_report(&m, &params).expect("El nombre de hoja no debe abortar el reporte");
    let hojas = decode_workbook(&buf).unwrap();
    assert_eq!(hojas.len(), 8);
    assert_eq!(hojas[5].sheet_name, HOJA_FALTAS);
    // el umbral se conserva en el resumen
    assert_eq!(hojas[5].summary[0].label, "Umbral de Faltas Consecutivas");
    assert_eq!(hojas[5].summary[0].value, CellValue::Number(100_000_000.0));
}
