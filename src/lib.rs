// Biblioteca raíz del crate `metricas`.
// Métricas de asistencia (impacto y gestión) sobre un snapshot del almacén,
// expuestas como JSON y como libros Excel.
pub mod config;
pub mod error;
pub mod excel;
pub mod metricas;
pub mod models;
pub mod reporte;
pub mod server;
pub mod server_handlers;
pub mod store;

pub use config::{Config, StoreConfig};
pub use error::MetricasError;
pub use metricas::{Metricas, MetricsPolicy, Periodo};
pub use models::Dataset;

/// Ejecuta el servidor HTTP (reexport para facilitar uso desde `main`)
pub use server::run_server;
