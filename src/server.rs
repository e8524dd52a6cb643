use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use chrono::NaiveDate;
use tracing::info;

use crate::config::Config;
use crate::metricas::MetricsPolicy;
use crate::server_handlers::{gestion, help_handler, impacto};
use crate::store::{open_store, AttendanceStore};

/// Estado compartido por los handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AttendanceStore>,
    pub policy: MetricsPolicy,
    /// Fecha fija para "hoy" (tests); si es `None` se usa la fecha local.
    pub today: Option<NaiveDate>,
}

impl AppState {
    pub fn new(store: Arc<dyn AttendanceStore>, policy: MetricsPolicy) -> Self {
        AppState { store, policy, today: None }
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

/// Registra todas las rutas. Se usa tanto en `run_server` como en los tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/impacto")
            .route("/tasa-asistencia", web::get().to(impacto::tasa_asistencia))
            .route("/asistencia-por-clase", web::get().to(impacto::asistencia_por_clase))
            .route("/alumnos-asistencia-regular", web::get().to(impacto::alumnos_asistencia_regular))
            .route("/frecuencia-asistencia", web::get().to(impacto::frecuencia_asistencia))
            .route("/retencion-alumnos", web::get().to(impacto::retencion_alumnos))
            .route("/dia-mayor-asistencia", web::get().to(impacto::dia_mayor_asistencia))
            .route("/promedio-sesiones", web::get().to(impacto::promedio_sesiones))
            .route("/excel", web::get().to(impacto::excel_impacto)),
    )
    .service(
        web::scope("/gestion")
            .route("/asistencia-diaria", web::get().to(gestion::asistencia_diaria))
            .route("/asistencia-semanal", web::get().to(gestion::asistencia_semanal))
            .route("/asistencia-mensual", web::get().to(gestion::asistencia_mensual))
            .route("/asistencia-irregular", web::get().to(gestion::asistencia_irregular))
            .route("/grupos-asistencia", web::get().to(gestion::grupos_asistencia))
            .route("/alumnos-inactivos", web::get().to(gestion::alumnos_inactivos))
            .route("/faltas-consecutivas", web::get().to(gestion::faltas_consecutivas))
            .route("/resumen-clases", web::get().to(gestion::resumen_clases))
            .route("/excel", web::get().to(gestion::excel_gestion)),
    )
    .route("/help", web::get().to(help_handler));
}

pub async fn run_server(config: Config) -> std::io::Result<()> {
    let store = open_store(&config.store).map_err(|e| std::io::Error::other(e.to_string()))?;
    info!(backend = store.backend(), bind = %config.bind, "iniciando servidor de métricas");
    let state = web::Data::new(AppState::new(store, config.policy.clone()));

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind(config.bind.as_str())?
    .run()
    .await
}
