//! Módulo `excel`: escritura y lectura de los reportes en formato `.xlsx`.
//!
//! Submódulos:
//! - `writer`: codifica secciones a un libro en memoria (`rust_xlsxwriter`)
//! - `io`: helpers de lectura con `calamine` y decodificación de vuelta a secciones

/// Codificación de secciones a `.xlsx`
pub mod writer;

/// Helpers de IO y decodificación
pub mod io;

pub use io::decode_workbook;
pub use writer::{encode_workbook, validate_sheet_names, MAX_SHEET_NAME};

/// Content-Type de un `.xlsx`
pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
