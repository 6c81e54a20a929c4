//! Text formatting shared by the HUD, lobby cards and result table.

use race_shared::room::RoomInfo;

/// English ordinal: 1st, 2nd, 3rd, 4th, 11th, 12th, 13th, 21st, 102nd...
pub fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

/// Rank as shown in the HUD; unranked players show `?`.
pub fn rank_label(rank: Option<u32>) -> String {
    match rank {
        Some(r) if r > 0 => ordinal(r),
        _ => "?".to_string(),
    }
}

/// Whole metres travelled, e.g. `120m`.
pub fn distance_label(z: f32) -> String {
    format!("{}m", z.floor() as i64)
}

pub fn speed_label(speed: f32) -> String {
    format!("{}", speed.floor() as i64)
}

/// Milliseconds as seconds with one decimal, e.g. `83.4s`.
pub fn seconds_label(ms: u64) -> String {
    format!("{:.1}s", ms as f64 / 1000.0)
}

/// First `n` characters of `s`.
pub fn prefix(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

/// `0x1234…cdef` style address.
pub fn short_address(addr: &str) -> String {
    let chars: Vec<char> = addr.chars().collect();
    if chars.len() <= 10 {
        return addr.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}

/// `ENDLESS_RACE  •  1/4 Players`
pub fn mode_line(room: &RoomInfo) -> String {
    format!(
        "{}  •  {}/{} Players",
        room.game_mode, room.current_players, room.max_players
    )
}

pub fn medal(rank: u32) -> String {
    match rank {
        1 => "🥇".to_string(),
        2 => "🥈".to_string(),
        3 => "🥉".to_string(),
        n => format!("{n}."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_follow_english_rules() {
        let got: Vec<_> = [1, 2, 3, 4, 11, 12, 13, 21, 22, 101, 111, 112]
            .into_iter()
            .map(ordinal)
            .collect();
        assert_eq!(
            got,
            ["1st", "2nd", "3rd", "4th", "11th", "12th", "13th", "21st", "22nd", "101st", "111th", "112th"]
        );
        assert_eq!(rank_label(None), "?");
        assert_eq!(rank_label(Some(0)), "?");
    }

    #[test]
    fn numeric_labels_truncate() {
        assert_eq!(distance_label(120.9), "120m");
        // Before the start line the raw floor shows through.
        assert_eq!(distance_label(-2.5), "-3m");
        assert_eq!(speed_label(40.0), "40");
        assert_eq!(seconds_label(83_449), "83.4s");
        assert_eq!(seconds_label(0), "0.0s");
    }

    #[test]
    fn addresses_are_shortened() {
        assert_eq!(short_address("0x1234567890abcdef"), "0x1234…cdef");
        assert_eq!(short_address("0xabc"), "0xabc");
        assert_eq!(prefix("abcdef", 3), "abc");
    }

    #[test]
    fn lobby_mode_line() {
        let room = RoomInfo {
            game_mode: "ENDLESS_RACE".into(),
            current_players: 1,
            max_players: 4,
            ..RoomInfo::default()
        };
        assert_eq!(mode_line(&room), "ENDLESS_RACE  •  1/4 Players");
        assert_eq!(medal(1), "🥇");
        assert_eq!(medal(5), "5.");
    }
}
