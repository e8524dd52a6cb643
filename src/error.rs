use thiserror::Error;

/// Errores del motor de métricas. Los resultados vacíos no son errores:
/// las secciones se generan con conteos en cero.
#[derive(Debug, Error)]
pub enum MetricasError {
    /// Parámetro inválido (fecha mal formada, id no numérico, periodo desconocido...)
    #[error("parámetro inválido: {0}")]
    InvalidInput(String),

    #[error("no encontrado: {0}")]
    NotFound(String),

    #[error("error de base de datos: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("error de postgres: {0}")]
    Postgres(String),

    #[error("error al generar el excel: {0}")]
    Encoder(String),

    #[error("error al leer el excel: {0}")]
    Decoder(String),

    #[error("configuración inválida: {0}")]
    Config(String),

    #[error("error interno: {0}")]
    Internal(String),
}

impl From<rust_xlsxwriter::XlsxError> for MetricasError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        MetricasError::Encoder(e.to_string())
    }
}

impl From<calamine::XlsxError> for MetricasError {
    fn from(e: calamine::XlsxError) -> Self {
        MetricasError::Decoder(e.to_string())
    }
}

impl From<postgres::Error> for MetricasError {
    fn from(e: postgres::Error) -> Self {
        MetricasError::Postgres(e.to_string())
    }
}

impl MetricasError {
    /// Errores atribuibles a la petición del cliente (HTTP 4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(self, MetricasError::InvalidInput(_) | MetricasError::NotFound(_))
    }
}
