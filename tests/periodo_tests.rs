mod test_support;

use metricas::metricas::periodo::{monday_of, month_window};
use metricas::metricas::{edad, Periodo};
use test_support::d;

#[test]
fn test_edad_cumple_el_mismo_dia() {
    let nacimiento = Some(d(2010, 5, 15));
    assert_eq!(edad(nacimiento, d(2024, 5, 14)), Some(13));
    assert_eq!(edad(nacimiento, d(2024, 5, 15)), Some(14));
    assert_eq!(edad(None, d(2024, 5, 15)), None);
}

#[test]
fn test_edad_nacido_29_febrero() {
    let nacimiento = Some(d(2008, 2, 29));
    assert_eq!(edad(nacimiento, d(2024, 2, 28)), Some(15));
    assert_eq!(edad(nacimiento, d(2024, 2, 29)), Some(16));
    assert_eq!(edad(nacimiento, d(2023, 3, 1)), Some(15));
}

#[test]
fn test_ventanas_relativas_a_hoy() {
    let hoy = d(2024, 5, 15); // miércoles

    let semana = Periodo::Semana.window(hoy);
    assert_eq!(semana.start, d(2024, 5, 13));
    assert_eq!(semana.end, d(2024, 5, 16));
    assert!(semana.contains(hoy));
    assert!(!semana.contains(d(2024, 5, 16)));

    let mes = Periodo::Mes.window(hoy);
    assert_eq!(mes.start, d(2024, 5, 1));
    assert_eq!(mes.last_day(), hoy);

    let anio = Periodo::Anio.window(hoy);
    assert_eq!(anio.start, d(2024, 1, 1));

    let treinta = Periodo::Ultimos30Dias.window(hoy);
    assert_eq!(treinta.start, d(2024, 4, 15));
}

#[test]
fn test_palabras_clave() {
    assert_eq!(Periodo::parse("semana").unwrap(), Periodo::Semana);
    assert_eq!(Periodo::parse("MES").unwrap(), Periodo::Mes);
    assert_eq!(Periodo::parse("año").unwrap(), Periodo::Anio);
    assert_eq!(Periodo::parse("anio").unwrap(), Periodo::Anio);
    assert!(Periodo::parse("trimestre").is_err());
    // la versión tolerante cae a los últimos 30 días
    assert_eq!(Periodo::from_keyword("trimestre"), Periodo::Ultimos30Dias);
}

#[test]
fn test_etiquetas() {
    let hoy = d(2024, 5, 15);
    assert_eq!(Periodo::Mes.label(hoy), "mayo 2024");
    assert_eq!(Periodo::Semana.label(hoy), "Semana del 2024-05-13");
    assert_eq!(Periodo::Anio.label(hoy), "Año 2024");
    let rango = Periodo::Rango { start: d(2024, 5, 1), end: d(2024, 5, 8) };
    assert_eq!(rango.label(hoy), "2024-05-01 a 2024-05-07");
}

#[test]
fn test_helpers_de_calendario() {
    assert_eq!(monday_of(d(2024, 5, 19)), d(2024, 5, 13));
    assert_eq!(monday_of(d(2024, 5, 13)), d(2024, 5, 13));
    let feb = month_window(2024, 2).unwrap();
    assert_eq!(feb.last_day(), d(2024, 2, 29));
}
