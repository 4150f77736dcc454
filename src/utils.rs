use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, NaiveDate, Utc};

/// Delimiter between artist names in the stored artist string.
pub const ARTIST_DELIMITER: &str = ", ";

/// Delimiter between genre tags in the stored genres string.
pub const GENRE_DELIMITER: &str = ", ";

/// Upper bound of the `playbacks.genres` column.
pub const GENRES_MAX_LEN: usize = 255;

/// Source of wall-clock time. Injected wherever expiry, debounce or
/// played-at timestamps are computed so tests can drive time by hand.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub fn join_artists(artists: &[String]) -> String {
    artists.join(ARTIST_DELIMITER)
}

pub fn split_artists(artist: &str) -> Vec<String> {
    artist
        .split(ARTIST_DELIMITER)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Value of the `Authorization` header for the authorization-code exchange.
pub fn basic_credentials(client_id: &str, client_secret: &str) -> String {
    let raw = format!("{client_id}:{client_secret}");
    format!("Basic {}", STANDARD.encode(raw))
}

/// Parses the provider's release date, which comes with year, month or day
/// precision. Missing month/day parts default to the first.
pub fn parse_release_date(date: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = date.trim().split('-').collect();
    let year = parts.first()?.parse::<i32>().ok()?;
    let month = match parts.get(1) {
        Some(m) => m.parse::<u32>().ok()?,
        None => 1,
    };
    let day = match parts.get(2) {
        Some(d) => d.parse::<u32>().ok()?,
        None => 1,
    };
    if parts.len() > 3 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Joins genre tags with `", "`, dropping trailing tags that would push the
/// result past `max_len` bytes. A first tag that is longer than `max_len` on
/// its own is cut at the last char boundary that fits.
pub fn join_genres(genres: &[String], max_len: usize) -> String {
    let mut joined = String::new();
    for genre in genres {
        if joined.is_empty() {
            if genre.len() > max_len {
                joined.push_str(truncate(genre, max_len));
                break;
            }
            joined.push_str(genre);
            continue;
        }
        if joined.len() + GENRE_DELIMITER.len() + genre.len() > max_len {
            break;
        }
        joined.push_str(GENRE_DELIMITER);
        joined.push_str(genre);
    }
    joined
}

fn truncate(value: &str, max_len: usize) -> &str {
    let mut end = max_len.min(value.len());
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

/// Renders a millisecond duration as `m:ss`.
pub fn format_duration(duration_ms: u64) -> String {
    let total_secs = duration_ms / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}
