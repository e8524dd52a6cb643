//! Periodos de análisis y utilidades de calendario.
//!
//! Un periodo con nombre (`semana`, `mes`, `año`) se traduce a una ventana
//! semiabierta `[start, end)` relativa a la fecha de hoy.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;

use crate::error::MetricasError;

const MESES: [&str; 12] = [
    "enero", "febrero", "marzo", "abril", "mayo", "junio",
    "julio", "agosto", "septiembre", "octubre", "noviembre", "diciembre",
];

pub const DIAS_SEMANA: [&str; 7] = ["Lunes", "Martes", "Miércoles", "Jueves", "Viernes", "Sábado", "Domingo"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Periodo {
    Semana,
    Mes,
    Anio,
    /// Ventana por defecto cuando la palabra clave no se reconoce.
    Ultimos30Dias,
    /// Rango explícito `[start, end)`.
    Rango { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodWindow {
    pub start: NaiveDate,
    /// Exclusivo
    pub end: NaiveDate,
}

impl PeriodWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    /// Último día incluido en la ventana.
    pub fn last_day(&self) -> NaiveDate {
        self.end.pred_opt().unwrap_or(self.end)
    }
}

impl Periodo {
    fn keyword(s: &str) -> Option<Periodo> {
        match s.trim().to_lowercase().as_str() {
            "semana" | "week" => Some(Periodo::Semana),
            "mes" | "month" => Some(Periodo::Mes),
            "año" | "anio" | "ano" | "year" => Some(Periodo::Anio),
            _ => None,
        }
    }

    /// Versión tolerante: una palabra clave desconocida cae a los últimos 30 días.
    pub fn from_keyword(s: &str) -> Periodo {
        Periodo::keyword(s).unwrap_or(Periodo::Ultimos30Dias)
    }

    /// Versión estricta para validar parámetros de entrada.
    pub fn parse(s: &str) -> Result<Periodo, MetricasError> {
        Periodo::keyword(s).ok_or_else(|| {
            MetricasError::InvalidInput(format!("periodo desconocido '{}': use semana, mes o año", s))
        })
    }

    pub fn window(&self, today: NaiveDate) -> PeriodWindow {
        let tomorrow = today + Duration::days(1);
        match *self {
            Periodo::Semana => PeriodWindow { start: monday_of(today), end: tomorrow },
            Periodo::Mes => PeriodWindow { start: first_of_month(today), end: tomorrow },
            Periodo::Anio => PeriodWindow {
                start: NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
                end: tomorrow,
            },
            Periodo::Ultimos30Dias => PeriodWindow { start: today - Duration::days(30), end: tomorrow },
            Periodo::Rango { start, end } => PeriodWindow { start, end },
        }
    }

    pub fn label(&self, today: NaiveDate) -> String {
        match *self {
            Periodo::Semana => format!("Semana del {}", monday_of(today)),
            Periodo::Mes => month_label(today.year(), today.month()),
            Periodo::Anio => format!("Año {}", today.year()),
            Periodo::Ultimos30Dias => "Últimos 30 días".to_string(),
            Periodo::Rango { start, end } => {
                let last = end.pred_opt().unwrap_or(end);
                format!("{} a {}", start, last)
            }
        }
    }
}

pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Ventana de 7 días a partir de `start`.
pub fn week_window(start: NaiveDate) -> PeriodWindow {
    PeriodWindow { start, end: start + Duration::days(7) }
}

pub fn month_window(year: i32, month: u32) -> Result<PeriodWindow, MetricasError> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| MetricasError::InvalidInput(format!("mes inválido: {}-{}", year, month)))?;
    let (ny, nm) = shift_month(year, month, 1);
    let end = NaiveDate::from_ymd_opt(ny, nm, 1)
        .ok_or_else(|| MetricasError::InvalidInput(format!("mes inválido: {}-{}", ny, nm)))?;
    Ok(PeriodWindow { start, end })
}

/// Desplaza (año, mes) en `delta` meses de calendario.
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let total = year * 12 + (month as i32 - 1) + delta;
    (total.div_euclid(12), (total.rem_euclid(12) + 1) as u32)
}

pub fn month_name(month: u32) -> &'static str {
    MESES.get((month as usize).wrapping_sub(1)).copied().unwrap_or("")
}

pub fn month_label(year: i32, month: u32) -> String {
    format!("{} {}", month_name(month), year)
}

pub fn weekday_name(day: Weekday) -> &'static str {
    DIAS_SEMANA[day.num_days_from_monday() as usize]
}

/// Edad en años cumplidos a la fecha `today`. `None` si no hay fecha de
/// nacimiento o si es posterior a hoy.
pub fn edad(birthdate: Option<NaiveDate>, today: NaiveDate) -> Option<u32> {
    let b = birthdate?;
    let mut years = today.year() - b.year();
    if (today.month(), today.day()) < (b.month(), b.day()) {
        years -= 1;
    }
    u32::try_from(years).ok().filter(|_| b <= today)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn shift_month_crosses_years() {
        assert_eq!(shift_month(2024, 1, -1), (2023, 12));
        assert_eq!(shift_month(2024, 12, 1), (2025, 1));
        assert_eq!(shift_month(2024, 3, -14), (2023, 1));
    }

    #[test]
    fn month_window_december() {
        let w = month_window(2023, 12).unwrap();
        assert_eq!(w.start, d(2023, 12, 1));
        assert_eq!(w.end, d(2024, 1, 1));
        assert!(month_window(2023, 13).is_err());
    }

    #[test]
    fn edad_futura_es_none() {
        assert_eq!(edad(Some(d(2030, 1, 1)), d(2024, 1, 1)), None);
        assert_eq!(edad(Some(d(2024, 1, 1)), d(2024, 1, 1)), Some(0));
    }
}
