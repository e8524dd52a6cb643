// --- Servidor de métricas de asistencia - Archivo principal ---

use metricas::{run_server, Config};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "configuración inválida");
            return Err(std::io::Error::other(e.to_string()));
        }
    };
    run_server(config).await
}
