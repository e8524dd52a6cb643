use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, DataType, Reader, Xlsx};

use super::writer::SUMMARY_HEADERS;
use crate::error::MetricasError;
use crate::models::parse_date;
use crate::reporte::{CellValue, Column, ReportSection, SummaryRow};

/// Convierte un `Data` de calamine a String (para etiquetas y encabezados)
pub fn cell_to_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => {
            if (f.floor() - f).abs() < f64::EPSILON {
                format!("{}", *f as i64)
            } else {
                format!("{}", f)
            }
        }
        Data::Int(i) => format!("{}", i),
        Data::Bool(b) => format!("{}", b),
        Data::Empty => String::new(),
        Data::Error(_) => String::new(),
        Data::DateTime(d) => d.as_datetime().map(|dt| dt.date().to_string()).unwrap_or_else(|| d.as_f64().to_string()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Convierte un `Data` de calamine al valor tipado de la celda.
pub fn cell_to_value(c: &Data) -> CellValue {
    match c {
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::DateTime(_) => c.as_datetime().map(|dt| CellValue::Date(dt.date())).unwrap_or(CellValue::Empty),
        Data::DateTimeIso(s) => parse_date(s.get(..10).unwrap_or(s))
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

fn is_blank(row: &[Data]) -> bool {
    row.iter().all(|c| matches!(c, Data::Empty))
}

/// Rearma una sección a partir de las filas de su hoja.
fn section_from_rows(name: &str, rows: &[Vec<Data>]) -> Result<ReportSection, MetricasError> {
    let mut section = ReportSection::new(name);
    let Some(first) = rows.first() else {
        return Ok(section);
    };
    let header: Vec<String> = first.iter().take(2).map(cell_to_string).collect();
    if header != SUMMARY_HEADERS {
        return Err(MetricasError::Decoder(format!("la hoja '{}' no empieza con el bloque resumen", name)));
    }

    let mut i = 1;
    while i < rows.len() && !is_blank(&rows[i]) {
        let r = &rows[i];
        section.summary.push(SummaryRow {
            label: r.first().map(cell_to_string).unwrap_or_default(),
            value: r.get(1).map(cell_to_value).unwrap_or(CellValue::Empty),
        });
        i += 1;
    }
    // saltar la fila en blanco
    while i < rows.len() && is_blank(&rows[i]) {
        i += 1;
    }
    let Some(detail_header) = rows.get(i) else {
        return Ok(section);
    };

    let mut headers: Vec<String> = detail_header.iter().map(cell_to_string).collect();
    while headers.last().is_some_and(|h| h.is_empty()) {
        headers.pop();
    }
    section.columns = headers.iter().map(|h| Column { key: h.clone(), header: h.clone() }).collect();

    for r in &rows[i + 1..] {
        let mut values: Vec<CellValue> = r.iter().take(headers.len()).map(cell_to_value).collect();
        values.resize(headers.len(), CellValue::Empty);
        section.rows.push(values);
    }
    Ok(section)
}

/// Abre un `.xlsx` en memoria y devuelve sus secciones en orden de hojas.
/// Las claves internas de columna no se guardan en el archivo: al leer se
/// usa el encabezado como clave.
pub fn decode_workbook(bytes: &[u8]) -> Result<Vec<ReportSection>, MetricasError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes.to_vec()))?;
    let names = workbook.sheet_names().to_owned();
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook.worksheet_range(&name)?;
        // el rango empieza en la primera celda usada (A1 para nuestras hojas)
        let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();
        out.push(section_from_rows(&name, &rows)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_to_string_enteros_sin_decimales() {
        assert_eq!(cell_to_string(&Data::Float(3.0)), "3");
        assert_eq!(cell_to_string(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_to_string(&Data::String("  ID ".into())), "ID");
    }

    #[test]
    fn hoja_sin_resumen_es_error() {
        let rows = vec![vec![Data::String("Otra".into()), Data::String("Cosa".into())]];
        assert!(section_from_rows("X", &rows).is_err());
    }

    #[test]
    fn detalle_se_rellena_hasta_el_encabezado() {
        let rows = vec![
            vec![Data::String("Métrica".into()), Data::String("Valor".into()), Data::Empty],
            vec![Data::String("Total".into()), Data::Float(2.0), Data::Empty],
            vec![Data::Empty, Data::Empty, Data::Empty],
            vec![Data::String("ID".into()), Data::String("Nombre".into()), Data::String("Edad".into())],
            vec![Data::Float(1.0), Data::String("Ana".into()), Data::Empty],
        ];
        let s = section_from_rows("Hoja", &rows).unwrap();
        assert_eq!(s.summary.len(), 1);
        assert_eq!(s.summary[0].value, CellValue::Number(2.0));
        assert_eq!(s.headers(), vec!["ID", "Nombre", "Edad"]);
        assert_eq!(s.rows[0], vec![CellValue::Number(1.0), CellValue::Text("Ana".into()), CellValue::Empty]);
    }
}
