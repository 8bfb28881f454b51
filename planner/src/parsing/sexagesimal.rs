//! Sexagesimal and decimal angle parsing.
//!
//! Right ascension is accepted as `hh:mm:ss.s` or as decimal hours,
//! declination as `[+-]dd:mm:ss.s` or as decimal degrees. Both return
//! degrees.

use qtty::Degrees;

/// Split `text` into a sign and up to three unsigned sexagesimal fields.
fn fields(text: &str) -> Result<(f64, [f64; 3]), String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("empty angle".to_string());
    }
    let (sign, body) = match trimmed.as_bytes()[0] {
        b'-' => (-1.0, &trimmed[1..]),
        b'+' => (1.0, &trimmed[1..]),
        _ => (1.0, trimmed),
    };
    let parts: Vec<&str> = body.split(':').collect();
    if parts.len() > 3 {
        return Err(format!("too many fields in '{}'", trimmed));
    }
    let mut values = [0.0; 3];
    for (i, part) in parts.iter().enumerate() {
        let value: f64 = part
            .trim()
            .parse()
            .map_err(|_| format!("invalid number '{}' in '{}'", part, trimmed))?;
        if !value.is_finite() || value < 0.0 {
            return Err(format!("invalid field '{}' in '{}'", part, trimmed));
        }
        if i > 0 && value >= 60.0 {
            return Err(format!("minutes and seconds must be below 60 in '{}'", trimmed));
        }
        values[i] = value;
    }
    Ok((sign, values))
}

fn combine(values: [f64; 3]) -> f64 {
    values[0] + values[1] / 60.0 + values[2] / 3_600.0
}

/// Parse right ascension (`hh:mm:ss.s` or decimal hours) into degrees.
///
/// # Example
///
/// ```
/// use visit_planner::parsing::sexagesimal::parse_ra;
///
/// assert_eq!(parse_ra("06:00:00").unwrap().value(), 90.0);
/// assert_eq!(parse_ra("1.5").unwrap().value(), 22.5);
/// ```
pub fn parse_ra(text: &str) -> Result<Degrees, String> {
    let (sign, values) = fields(text)?;
    if sign < 0.0 {
        return Err(format!("right ascension '{}' must not be negative", text.trim()));
    }
    let hours = combine(values);
    if hours >= 24.0 {
        return Err(format!("right ascension '{}' is not below 24 h", text.trim()));
    }
    Ok(Degrees::new(hours * 15.0))
}

/// Parse declination (`[+-]dd:mm:ss.s` or decimal degrees) into degrees.
pub fn parse_dec(text: &str) -> Result<Degrees, String> {
    let (sign, values) = fields(text)?;
    let degrees = combine(values);
    if degrees > 90.0 {
        return Err(format!("declination '{}' is beyond the pole", text.trim()));
    }
    Ok(Degrees::new(sign * degrees))
}

/// Format right ascension as `hh:mm:ss.sss`.
pub fn format_ra(ra: Degrees) -> String {
    let millis = (ra.value().rem_euclid(360.0) / 15.0 * 3_600_000.0).round() as u64 % 86_400_000;
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        millis / 3_600_000,
        (millis / 60_000) % 60,
        (millis / 1_000) % 60,
        millis % 1_000
    )
}

/// Format declination as `+dd:mm:ss.ss`.
pub fn format_dec(dec: Degrees) -> String {
    let sign = if dec.value() < 0.0 { '-' } else { '+' };
    let centis = (dec.value().abs() * 360_000.0).round() as u64;
    format!(
        "{}{:02}:{:02}:{:02}.{:02}",
        sign,
        centis / 360_000,
        (centis / 6_000) % 60,
        (centis / 100) % 60,
        centis % 100
    )
}
