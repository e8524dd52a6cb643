use chrono::{Datelike, NaiveDate};
use rust_xlsxwriter::{Color, ExcelDateTime, Format, FormatBorder, Workbook, Worksheet};
use tracing::debug;

use crate::error::MetricasError;
use crate::reporte::{CellValue, ReportSection};

pub const SUMMARY_HEADERS: [&str; 2] = ["Métrica", "Valor"];
pub const MAX_SHEET_NAME: usize = 31;
const MAX_COL_WIDTH: usize = 60;

struct Formats {
    header: Format,
    label: Format,
    decimal: Format,
    date: Format,
}

impl Formats {
    fn new() -> Self {
        Formats {
            header: Format::new()
                .set_bold()
                .set_background_color(Color::RGB(0x4472C4))
                .set_font_color(Color::White)
                .set_border(FormatBorder::Thin),
            label: Format::new().set_bold(),
            decimal: Format::new().set_num_format("0.00"),
            date: Format::new().set_num_format("yyyy-mm-dd"),
        }
    }
}

/// Nombres de hoja válidos para Excel: no vacíos, hasta 31 caracteres, sin
/// `[]:*?/\` y únicos sin distinguir mayúsculas.
pub fn validate_sheet_names(sections: &[ReportSection]) -> Result<(), MetricasError> {
    let mut vistos: Vec<String> = Vec::with_capacity(sections.len());
    for s in sections {
        let name = s.sheet_name.as_str();
        if name.trim().is_empty() {
            return Err(MetricasError::Encoder("nombre de hoja vacío".into()));
        }
        if name.chars().count() > MAX_SHEET_NAME {
            return Err(MetricasError::Encoder(format!("nombre de hoja demasiado largo: '{}'", name)));
        }
        if let Some(c) = name.chars().find(|c| matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\')) {
            return Err(MetricasError::Encoder(format!("carácter '{}' no permitido en la hoja '{}'", c, name)));
        }
        let lower = name.to_lowercase();
        if vistos.contains(&lower) {
            return Err(MetricasError::Encoder(format!("hoja duplicada: '{}'", name)));
        }
        vistos.push(lower);
    }
    Ok(())
}

fn excel_date(d: NaiveDate) -> Result<ExcelDateTime, MetricasError> {
    let year = u16::try_from(d.year()).map_err(|_| MetricasError::Encoder(format!("fecha fuera de rango: {}", d)))?;
    Ok(ExcelDateTime::from_ymd(year, d.month() as u8, d.day() as u8)?)
}

fn write_cell(ws: &mut Worksheet, row: u32, col: u16, value: &CellValue, f: &Formats) -> Result<(), MetricasError> {
    match value {
        CellValue::Text(t) => {
            ws.write_string(row, col, t)?;
        }
        CellValue::Number(n) => {
            if !n.is_finite() {
                return Err(MetricasError::Encoder(format!("valor numérico no representable en ({}, {}): {}", row, col, n)));
            }
            if n.fract() == 0.0 {
                ws.write_number(row, col, *n)?;
            } else {
                ws.write_number_with_format(row, col, *n, &f.decimal)?;
            }
        }
        CellValue::Date(d) => {
            ws.write_datetime_with_format(row, col, &excel_date(*d)?, &f.date)?;
        }
        CellValue::Empty => {}
    }
    Ok(())
}

fn display_len(value: &CellValue) -> usize {
    match value {
        CellValue::Text(t) => t.chars().count(),
        CellValue::Number(n) => format!("{:.2}", n).len(),
        CellValue::Date(_) => 10,
        CellValue::Empty => 0,
    }
}

fn write_section(ws: &mut Worksheet, section: &ReportSection, f: &Formats) -> Result<(), MetricasError> {
    ws.set_name(&section.sheet_name)?;

    let ncols = section.columns.len().max(SUMMARY_HEADERS.len());
    let mut widths = vec![0usize; ncols];

    // bloque resumen
    for (col, h) in SUMMARY_HEADERS.iter().enumerate() {
        ws.write_string_with_format(0, col as u16, *h, &f.header)?;
        widths[col] = widths[col].max(h.chars().count());
    }
    let mut row: u32 = 1;
    for s in &section.summary {
        ws.write_string_with_format(row, 0, &s.label, &f.label)?;
        write_cell(ws, row, 1, &s.value, f)?;
        widths[0] = widths[0].max(s.label.chars().count());
        widths[1] = widths[1].max(display_len(&s.value));
        row += 1;
    }

    if section.columns.is_empty() && !section.rows.is_empty() {
        return Err(MetricasError::Encoder(format!(
            "la hoja '{}' tiene {} filas de detalle sin columnas",
            section.sheet_name,
            section.rows.len()
        )));
    }

    // una fila en blanco y luego el detalle
    if !section.columns.is_empty() {
        row += 1;
        for (col, c) in section.columns.iter().enumerate() {
            ws.write_string_with_format(row, col as u16, &c.header, &f.header)?;
            widths[col] = widths[col].max(c.header.chars().count());
        }
        row += 1;
        for detail in &section.rows {
            if detail.len() > section.columns.len() {
                return Err(MetricasError::Encoder(format!(
                    "fila con {} celdas en la hoja '{}' ({} columnas)",
                    detail.len(),
                    section.sheet_name,
                    section.columns.len()
                )));
            }
            for (col, v) in detail.iter().enumerate() {
                write_cell(ws, row, col as u16, v, f)?;
                widths[col] = widths[col].max(display_len(v));
            }
            row += 1;
        }
    }

    for (col, w) in widths.iter().enumerate() {
        ws.set_column_width(col as u16, (*w + 2).min(MAX_COL_WIDTH) as f64)?;
    }
    ws.set_freeze_panes(1, 0)?;
    Ok(())
}

/// Escribe una hoja por sección y devuelve el `.xlsx` en memoria. Si algo
/// falla no se devuelve ningún buffer parcial.
pub fn encode_workbook(sections: &[ReportSection]) -> Result<Vec<u8>, MetricasError> {
    validate_sheet_names(sections)?;
    let formats = Formats::new();
    let mut workbook = Workbook::new();
    for section in sections {
        let ws = workbook.add_worksheet();
        write_section(ws, section, &formats)?;
    }
    if sections.is_empty() {
        // un libro sin hojas no es válido
        workbook.add_worksheet();
    }
    let buf = workbook.save_to_buffer()?;
    debug!(sheets = sections.len(), bytes = buf.len(), "workbook codificado");
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(name: &str) -> ReportSection {
        ReportSection::new(name)
    }

    #[test]
    fn nombres_invalidos() {
        assert!(validate_sheet_names(&[sheet("")]).is_err());
        assert!(validate_sheet_names(&[sheet("a/b")]).is_err());
        assert!(validate_sheet_names(&[sheet(&"x".repeat(32))]).is_err());
        assert!(validate_sheet_names(&[sheet("Hoja"), sheet("HOJA")]).is_err());
        assert!(validate_sheet_names(&[sheet("Retención Mes a Mes"), sheet("Más de 30 Faltas Seguidas")]).is_ok());
    }

    #[test]
    fn numero_no_finito_falla() {
        let s = ReportSection::new("X").summary("nan", f64::NAN);
        assert!(matches!(encode_workbook(&[s]), Err(MetricasError::Encoder(_))));
    }

    #[test]
    fn fila_mas_larga_que_columnas_falla() {
        let mut s = ReportSection::new("X").columns(&[("a", "A")]);
        s.push_row(vec![CellValue::from(1usize), CellValue::from(2usize)]);
        assert!(encode_workbook(&[s]).is_err());
    }

    #[test]
    fn filas_sin_columnas_falla() {
        let mut s = ReportSection::new("X").summary("Total", 1usize);
        s.push_row(vec![CellValue::from(1usize)]);
        assert!(matches!(encode_workbook(&[s]), Err(MetricasError::Encoder(_))));
    }
}
