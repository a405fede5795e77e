//! Seat label grammar and the floor/direction region table.
//!
//! A seat label is a human-entered coordinate like `03EN11F` or
//! `03-EN-11-F`: two-digit floor, direction code, two-digit table number,
//! one column letter. The catalog's numeric region ids and Chinese display
//! names are fixed deployment data, kept here as plain tables.

use regex::Regex;
use tracing::warn;

/// Catalog-assigned numeric seat identifier.
pub type SeatId = i64;

/// `{floor}-{direction}` to catalog region id.
///
/// Deployment data, not derivable. The `10-WS` entry really is 4 in the
/// live catalog, out of sequence with its neighbors.
const REGION_IDS: &[(&str, i64)] = &[
    ("03-EN", 7),
    ("03-ES", 8),
    ("03-WN", 9),
    ("03-WS", 10),
    ("04-EN", 11),
    ("04-ES", 12),
    ("04-WN", 13),
    ("04-WS", 14),
    ("05-EN", 15),
    ("05-ES", 16),
    ("05-MM", 17),
    ("05-WN", 18),
    ("05-WS", 19),
    ("06-EN", 20),
    ("06-ES", 21),
    ("06-WN", 22),
    ("06-WS", 23),
    ("07-EN", 24),
    ("07-ES", 25),
    ("07-WN", 26),
    ("07-WS", 27),
    ("08-EN", 28),
    ("08-ES", 29),
    ("08-MM", 30),
    ("08-WN", 31),
    ("08-WS", 32),
    ("09-EN", 33),
    ("09-ES", 34),
    ("09-WN", 35),
    ("09-WS", 36),
    ("09-MM", 37),
    ("10-EN", 38),
    ("10-ES", 39),
    ("10-WN", 40),
    ("10-WS", 4),
];

/// A validated, normalized seat label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatLabel {
    /// Two-digit floor, e.g. `03`.
    pub floor: String,
    /// Direction code: `EN`, `ES`, `WN`, `WS`, or `MM`.
    pub direction: String,
    /// Table number within the region.
    pub table: u32,
    /// Column letter at the table.
    pub column: char,
}

impl SeatLabel {
    /// Parse a raw label: trim, uppercase, strip dashes, then validate
    /// against the grammar. Malformed input is an expected edge case and
    /// yields `None` with a warning, never an error.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_uppercase().replace('-', "");
        if normalized.is_empty() {
            return None;
        }

        let grammar = Regex::new("^[0-9]{2}(EN|ES|WN|WS|MM)[0-9]{2}[A-Z]$")
            .expect("seat label regex is valid");
        if !grammar.is_match(&normalized) {
            warn!(label = raw, "seat label does not match the grammar");
            return None;
        }

        let table: u32 = normalized[4..6].parse().ok()?;
        let column = normalized.chars().nth(6)?;
        Some(Self {
            floor: normalized[0..2].to_string(),
            direction: normalized[2..4].to_string(),
            table,
            column,
        })
    }

    /// Catalog region id for this floor/direction, if the combination exists.
    pub fn region_id(&self) -> Option<i64> {
        let key = format!("{}-{}", self.floor, self.direction);
        REGION_IDS
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, id)| *id)
    }

    /// Human-readable region name as it appears in catalog seat names,
    /// e.g. `三层东书库北区`.
    pub fn region_display_name(&self) -> String {
        let floor = chinese_floor(&self.floor);
        let area = match self.direction.as_str() {
            "EN" => "东书库北区",
            "ES" => "东书库南区",
            "WN" => "西书库北区",
            "WS" => "西书库南区",
            "MM" => "中区",
            _ => "",
        };
        format!("{floor}{area}")
    }

    /// Display-name suffix used by desk-numbered regions, e.g. `" 11桌 F座"`.
    pub fn desk_suffix(&self) -> String {
        format!(" {:02}桌 {}座", self.table, self.column)
    }

    /// Display-name suffix used by seat-numbered regions (the central
    /// areas), e.g. `" 11座 F座"`.
    pub fn seat_suffix(&self) -> String {
        format!(" {:02}座 {}座", self.table, self.column)
    }
}

/// Chinese floor name: `03` is `三层`; unmapped floors fall back to
/// `{floor}层`.
fn chinese_floor(floor: &str) -> String {
    match floor {
        "03" => "三层".to_string(),
        "04" => "四层".to_string(),
        "05" => "五层".to_string(),
        "06" => "六层".to_string(),
        "07" => "七层".to_string(),
        "08" => "八层".to_string(),
        "09" => "九层".to_string(),
        "10" => "十层".to_string(),
        other => format!("{other}层"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_label() {
        let seat = SeatLabel::parse("03EN11F").unwrap();
        assert_eq!(seat.floor, "03");
        assert_eq!(seat.direction, "EN");
        assert_eq!(seat.table, 11);
        assert_eq!(seat.column, 'F');
    }

    #[test]
    fn test_parse_normalizes_dashes_case_whitespace() {
        let seat = SeatLabel::parse("  03-en-11-f ").unwrap();
        assert_eq!(seat, SeatLabel::parse("03EN11F").unwrap());
    }

    #[test]
    fn test_parse_rejects_unknown_direction() {
        // Dashes are stripped first, so this reaches the grammar as 03XX11F.
        assert!(SeatLabel::parse("03-XX-11-F").is_none());
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        assert!(SeatLabel::parse("").is_none());
        assert!(SeatLabel::parse("3EN11F").is_none());
        assert!(SeatLabel::parse("03EN1F").is_none());
        assert!(SeatLabel::parse("03EN11").is_none());
        assert!(SeatLabel::parse("03EN119").is_none());
        assert!(SeatLabel::parse("03EN11FF").is_none());
    }

    #[test]
    fn test_region_ids() {
        assert_eq!(SeatLabel::parse("03EN01A").unwrap().region_id(), Some(7));
        assert_eq!(SeatLabel::parse("05MM02B").unwrap().region_id(), Some(17));
        assert_eq!(SeatLabel::parse("09MM10C").unwrap().region_id(), Some(37));
        // Out-of-sequence catalog assignment.
        assert_eq!(SeatLabel::parse("10WS01A").unwrap().region_id(), Some(4));
    }

    #[test]
    fn test_region_id_unknown_combination() {
        // 11EN passes the grammar but no such region exists.
        assert!(SeatLabel::parse("11EN01A").unwrap().region_id().is_none());
        // MM only exists on floors 05, 08, 09.
        assert!(SeatLabel::parse("03MM01A").unwrap().region_id().is_none());
    }

    #[test]
    fn test_region_display_name() {
        assert_eq!(
            SeatLabel::parse("03EN11F").unwrap().region_display_name(),
            "三层东书库北区"
        );
        assert_eq!(
            SeatLabel::parse("05MM01A").unwrap().region_display_name(),
            "五层中区"
        );
        assert_eq!(
            SeatLabel::parse("10WS03C").unwrap().region_display_name(),
            "十层西书库南区"
        );
    }

    #[test]
    fn test_suffixes_zero_pad_table() {
        let seat = SeatLabel::parse("03EN01A").unwrap();
        assert_eq!(seat.desk_suffix(), " 01桌 A座");
        assert_eq!(seat.seat_suffix(), " 01座 A座");

        let seat = SeatLabel::parse("03EN11F").unwrap();
        assert_eq!(seat.desk_suffix(), " 11桌 F座");
    }
}
