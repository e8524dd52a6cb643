//! Armado de reportes: convierte los resultados de los calculadores en
//! secciones tabulares con nombre (una hoja por sección).
//!
//! Cada sección tiene un bloque resumen `Métrica | Valor` seguido,
//! cuando aplica, de una tabla de detalle. Las etiquetas de columna visibles
//! se definen aquí; el codificador solo escribe lo que recibe.

pub mod gestion;
pub mod impacto;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use crate::error::MetricasError;

pub use gestion::{generate_management_report, management_sections, ManagementParams};
pub use impacto::{generate_impact_report, impact_sections, ImpactParams};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Empty,
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::from(s.to_string())
    }
}

// Un texto vacío se escribe como celda en blanco, así que se normaliza aquí.
impl From<String> for CellValue {
    fn from(s: String) -> Self {
        if s.is_empty() { CellValue::Empty } else { CellValue::Text(s) }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<usize> for CellValue {
    fn from(n: usize) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<u32> for CellValue {
    fn from(n: u32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        CellValue::Date(d)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(CellValue::Empty)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub label: String,
    pub value: CellValue,
}

/// Columna de detalle: clave interna y encabezado visible.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub key: String,
    pub header: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSection {
    pub sheet_name: String,
    pub summary: Vec<SummaryRow>,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<CellValue>>,
}

impl ReportSection {
    pub fn new(sheet_name: impl Into<String>) -> Self {
        ReportSection { sheet_name: sheet_name.into(), summary: Vec::new(), columns: Vec::new(), rows: Vec::new() }
    }

    pub fn summary(mut self, label: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.summary.push(SummaryRow { label: label.into(), value: value.into() });
        self
    }

    /// Define las columnas como pares (clave, encabezado).
    pub fn columns(mut self, cols: &[(&str, &str)]) -> Self {
        self.columns = cols
            .iter()
            .map(|(key, header)| Column { key: key.to_string(), header: header.to_string() })
            .collect();
        self
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.header.as_str()).collect()
    }

    /// Sección que reemplaza a una que falló: mismo nombre, el error en el resumen.
    pub fn failed(sheet_name: impl Into<String>, err: &MetricasError) -> Self {
        ReportSection::new(sheet_name).summary("Error", err.to_string())
    }
}

/// Envuelve el resultado de una sección: si falló, deja constancia en una
/// sección de error en lugar de abortar el reporte completo.
pub(crate) fn section_or_error(name: &str, res: Result<ReportSection, MetricasError>) -> ReportSection {
    match res {
        Ok(section) => section,
        Err(e) => {
            warn!(section = name, error = %e, "sección con error");
            ReportSection::failed(name, &e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texto_vacio_es_celda_vacia() {
        assert_eq!(CellValue::from(""), CellValue::Empty);
        assert_eq!(CellValue::from(None::<u32>), CellValue::Empty);
        assert_eq!(CellValue::from(Some(3u32)), CellValue::Number(3.0));
    }

    #[test]
    fn seccion_fallida_conserva_nombre() {
        let err = MetricasError::NotFound("clase 9".into());
        let s = section_or_error("Lista Asistencia Diaria", Err(err));
        assert_eq!(s.sheet_name, "Lista Asistencia Diaria");
        assert_eq!(s.summary[0].label, "Error");
        assert!(matches!(&s.summary[0].value, CellValue::Text(t) if t.contains("clase 9")));
    }
}
