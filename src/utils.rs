use std::time::Duration;

/// Exponential backoff: `base`, `2 * base`, `4 * base`, ... capped at 30s.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32 << attempt.min(16)).min(Duration::from_secs(30))
}

pub fn fill_tile_url(template: &str, z: u32, x: u32, y: u32) -> String {
    template
        .replace("{z}", &z.to_string())
        .replace("{x}", &x.to_string())
        .replace("{y}", &y.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff_delay(base, 0), Duration::from_millis(500));
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 3), Duration::from_secs(4));
        assert_eq!(backoff_delay(base, 40), Duration::from_secs(30));
    }

    #[test]
    fn tile_url_placeholders() {
        assert_eq!(
            fill_tile_url("https://tile.openstreetmap.org/{z}/{x}/{y}.png", 5, 7, 12),
            "https://tile.openstreetmap.org/5/7/12.png"
        );
    }
}
