use actix_web::{HttpResponse, Responder};
use serde_json::json;

/// GET /help: lista de endpoints y parámetros aceptados.
pub async fn help_handler() -> impl Responder {
    let help = json!({
        "description": "API de métricas de asistencia. Todos los endpoints son GET y responden JSON, salvo /excel que descarga un .xlsx.",
        "periodos": ["semana", "mes", "año"],
        "impacto": {
            "/impacto/tasa-asistencia": "periodo, clase_id",
            "/impacto/asistencia-por-clase": "periodo",
            "/impacto/alumnos-asistencia-regular": "periodo, umbral (0-1, por defecto 0.5)",
            "/impacto/frecuencia-asistencia": "periodo",
            "/impacto/retencion-alumnos": "meses (1-60, por defecto 6)",
            "/impacto/dia-mayor-asistencia": "periodo",
            "/impacto/promedio-sesiones": "periodo",
            "/impacto/excel": "periodo, clase_id, meses, umbral"
        },
        "gestion": {
            "/gestion/asistencia-diaria": "fecha (YYYY-MM-DD, por defecto hoy), clase_id",
            "/gestion/asistencia-semanal": "fecha_inicio (YYYY-MM-DD, por defecto el lunes actual), clase_id",
            "/gestion/asistencia-mensual": "mes (1-12), anio, clase_id",
            "/gestion/asistencia-irregular": "periodo, umbral (0-1, por defecto 0.25)",
            "/gestion/grupos-asistencia": "criterio (sexo | edad), periodo",
            "/gestion/alumnos-inactivos": "dias (>= 0, por defecto 30)",
            "/gestion/faltas-consecutivas": "umbral (0-365, por defecto 30)",
            "/gestion/resumen-clases": "",
            "/gestion/excel": "fecha, fecha_inicio, mes, anio, clase_id, periodo, criterio, umbral, faltas, dias"
        },
        "example": "/gestion/asistencia-mensual?mes=5&anio=2024&clase_id=2"
    });

    HttpResponse::Ok().json(help)
}
