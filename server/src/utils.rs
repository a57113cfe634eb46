use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

/// Picks a display color for a connection, cycling through a fixed palette
pub fn generate_color(connection_id: u32) -> String {
    let colors = [
        "#4287f5", "#f54242", "#42f554", "#a142f5", "#f5a142", "#42f5e9", "#f542c8", "#f5e942",
    ];
    colors[connection_id as usize % colors.len()].to_string()
}

pub fn generate_username(connection_id: u32) -> String {
    format!("Player{}", connection_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_palette_cycles() {
        assert_eq!(generate_color(1), generate_color(9));
        assert_ne!(generate_color(1), generate_color(2));
        assert!(generate_color(0).starts_with('#'));
    }

    #[test]
    fn test_timestamp_is_monotonic_enough() {
        let t1 = get_timestamp();
        std::thread::sleep(Duration::from_millis(2));
        let t2 = get_timestamp();
        assert!(t2 > t1);
    }

    #[test]
    fn test_username() {
        assert_eq!(generate_username(3), "Player3");
    }
}
