use time::OffsetDateTime;
use uuid::Uuid;

/// Strips Quake-style `^N` color codes from a display name.
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '^' {
            if let Some(next) = chars.peek() {
                if next.is_ascii_digit() {
                    chars.next();
                    continue;
                }
            }
        }
        out.push(ch);
    }
    out
}

/// Converts a tracker timestamp (seconds, fractional) to a datetime.
/// Non-positive or unrepresentable values fall back to `received_at`.
pub fn event_time(seconds: f64, received_at: OffsetDateTime) -> OffsetDateTime {
    if !seconds.is_finite() || seconds <= 0.0 {
        return received_at;
    }
    let nanos = (seconds * 1_000_000_000.0) as i128;
    OffsetDateTime::from_unix_timestamp_nanos(nanos).unwrap_or(received_at)
}

/// Match ids are free-form on the wire. UUID-shaped ids are kept, anything else
/// maps to a stable name-based UUID so the same match always lands on one key.
pub fn match_uuid(match_id: &str) -> Uuid {
    let trimmed = match_id.trim();
    if trimmed.is_empty() {
        return Uuid::nil();
    }
    Uuid::parse_str(trimmed).unwrap_or_else(|_| Uuid::new_v5(&Uuid::NAMESPACE_URL, trimmed.as_bytes()))
}

pub fn distance_3d(a: (f32, f32, f32), b: (f32, f32, f32)) -> f32 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    let dz = a.2 - b.2;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Game scripts send numbers as JSON numbers, strings or form values.
pub mod lenient {
    use std::str::FromStr;

    use serde::{Deserialize, Deserializer};

    pub trait LenientNumber: FromStr + Default {
        fn from_f64(value: f64) -> Self;
    }

    impl LenientNumber for f64 {
        fn from_f64(value: f64) -> Self {
            value
        }
    }

    impl LenientNumber for f32 {
        fn from_f64(value: f64) -> Self {
            value as f32
        }
    }

    impl LenientNumber for i64 {
        fn from_f64(value: f64) -> Self {
            value as i64
        }
    }

    impl LenientNumber for i32 {
        fn from_f64(value: f64) -> Self {
            value as i32
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr<T> {
        Exact(T),
        Float(f64),
        Text(String),
        Null,
    }

    /// Accepts a number, a numeric string, or null. Unparseable text becomes zero.
    pub fn number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: LenientNumber + Deserialize<'de>,
    {
        Ok(match Repr::<T>::deserialize(deserializer)? {
            Repr::Exact(value) => value,
            Repr::Float(value) => T::from_f64(value),
            Repr::Text(text) => {
                let text = text.trim();
                text.parse::<T>()
                    .ok()
                    .or_else(|| text.parse::<f64>().ok().map(T::from_f64))
                    .unwrap_or_default()
            }
            Repr::Null => T::default(),
        })
    }
}
