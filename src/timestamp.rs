//! SRT timestamp codec: `HH:MM:SS,mmm` <-> seconds.

use crate::errors::SubtitleError;

/// Parse an SRT timestamp (`HH:MM:SS,mmm`) into seconds.
///
/// The seconds field must use a comma as decimal separator; `00:00:01.000`
/// is rejected.
pub fn parse_timestamp(value: &str) -> Result<f64, SubtitleError> {
    let trimmed = value.trim();
    let fields: Vec<&str> = trimmed.split(':').collect();
    if fields.len() != 3 {
        return Err(SubtitleError::timestamp(
            value,
            format!("expected 3 colon-separated fields, found {}", fields.len()),
        ));
    }

    let hours = parse_digits(fields[0])
        .ok_or_else(|| SubtitleError::timestamp(value, "hours are not numeric"))?;
    let minutes = parse_digits(fields[1])
        .ok_or_else(|| SubtitleError::timestamp(value, "minutes are not numeric"))?;

    let (whole, fraction) = fields[2]
        .split_once(',')
        .ok_or_else(|| SubtitleError::timestamp(value, "seconds must use ',' before milliseconds"))?;
    let seconds = parse_digits(whole)
        .ok_or_else(|| SubtitleError::timestamp(value, "seconds are not numeric"))?;
    if fraction.is_empty() || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(SubtitleError::timestamp(value, "milliseconds are not numeric"));
    }

    if minutes >= 60 || seconds >= 60 {
        return Err(SubtitleError::timestamp(value, "minutes and seconds must be below 60"));
    }

    let fractional: f64 = format!("0.{}", fraction)
        .parse()
        .map_err(|_| SubtitleError::timestamp(value, "milliseconds are not numeric"))?;

    let whole_seconds = hours
        .checked_mul(3600)
        .and_then(|h| h.checked_add(minutes * 60 + seconds))
        .ok_or_else(|| SubtitleError::timestamp(value, "hours out of range"))?;

    Ok(whole_seconds as f64 + fractional)
}

/// Format seconds as an SRT timestamp, rounded to whole milliseconds.
pub fn format_timestamp(seconds: f64) -> String {
    let ms = seconds_to_ms(seconds);
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let secs = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Round seconds to integer milliseconds. Negative and NaN values clamp to 0.
pub fn seconds_to_ms(seconds: f64) -> u64 {
    if seconds.is_nan() || seconds <= 0.0 {
        return 0;
    }
    (seconds * 1000.0).round() as u64
}

fn parse_digits(field: &str) -> Option<u64> {
    if field.is_empty() || !field.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}
