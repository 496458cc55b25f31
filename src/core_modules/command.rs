// THEORY:
// The command resolver is a deterministic case table, not a planner. Every
// behavior the actuator can be asked for is enumerated up front as a static
// case, and resolution is a pure lookup:
//
// 1.  **Single-object cases** match on (color, bearing, distance zone). The
//     distance axis is partitioned into three named zones — near, mid, far —
//     with fixed, non-overlapping bounds; a distance in none of them simply
//     resolves to the sentinel.
// 2.  **Dual-object cases** match on the color/bearing pattern of both
//     ranked detections, but only when the geometry gate holds: primary in
//     the near zone AND secondary in the far zone. Any other configuration
//     falls back to resolving the primary alone — partial dual geometry must
//     never produce a worse outcome than trusting the strongest detection.
//
// Codes are unique across both tables. The wire format is a short token:
// a case code, the sentinel "N", or (in raw mode) a color,distance,bearing
// triple the way the actuator firmware historically consumed it.

use crate::core_modules::geometry::Bearing;
use crate::core_modules::segmenter::TargetColor;

/// Sentinel token meaning "no valid detection".
pub const NO_DETECTION_CODE: &str = "N";

/// Near zone bounds in centimeters (inclusive).
pub const NEAR_MIN_CM: u32 = 40;
pub const NEAR_MAX_CM: u32 = 60;

/// Mid zone bounds in centimeters (inclusive).
pub const MID_MIN_CM: u32 = 80;
pub const MID_MAX_CM: u32 = 100;

/// Far zone bounds in centimeters (inclusive).
pub const FAR_MIN_CM: u32 = 110;
pub const FAR_MAX_CM: u32 = 130;

pub fn in_near_zone(distance_cm: u32) -> bool {
    (NEAR_MIN_CM..=NEAR_MAX_CM).contains(&distance_cm)
}

pub fn in_mid_zone(distance_cm: u32) -> bool {
    (MID_MIN_CM..=MID_MAX_CM).contains(&distance_cm)
}

pub fn in_far_zone(distance_cm: u32) -> bool {
    (FAR_MIN_CM..=FAR_MAX_CM).contains(&distance_cm)
}

/// A single-object command case.
#[derive(Debug, Clone, Copy)]
pub struct CommandCase {
    pub code: &'static str,
    pub color: TargetColor,
    pub bearing: Bearing,
    pub distance_min_cm: u32,
    pub distance_max_cm: u32,
    pub description: &'static str,
}

impl CommandCase {
    fn matches(&self, color: TargetColor, bearing: Bearing, distance_cm: u32) -> bool {
        self.color == color
            && self.bearing == bearing
            && (self.distance_min_cm..=self.distance_max_cm).contains(&distance_cm)
    }
}

/// A dual-object command case, matched only once the near/far geometry gate
/// has already been checked.
#[derive(Debug, Clone, Copy)]
pub struct DualCase {
    pub code: &'static str,
    pub primary_color: TargetColor,
    pub primary_bearing: Bearing,
    pub secondary_color: TargetColor,
    pub secondary_bearing: Bearing,
    pub description: &'static str,
}

use crate::core_modules::geometry::Bearing::{Left, Right};
use crate::core_modules::segmenter::TargetColor::{Green, Red};

/// All single-object cases. Magenta marks the parking section and has no
/// case here; it is only reachable through the raw pilar encoding.
pub const SINGLE_CASES: [CommandCase; 12] = [
    // Near zone.
    CommandCase { code: "C01", color: Green, bearing: Right, distance_min_cm: NEAR_MIN_CM, distance_max_cm: NEAR_MAX_CM, description: "Green, near right" },
    CommandCase { code: "C02", color: Red, bearing: Right, distance_min_cm: NEAR_MIN_CM, distance_max_cm: NEAR_MAX_CM, description: "Red, near right" },
    CommandCase { code: "C07", color: Green, bearing: Left, distance_min_cm: NEAR_MIN_CM, distance_max_cm: NEAR_MAX_CM, description: "Green, near left" },
    CommandCase { code: "C08", color: Red, bearing: Left, distance_min_cm: NEAR_MIN_CM, distance_max_cm: NEAR_MAX_CM, description: "Red, near left" },
    // Mid zone.
    CommandCase { code: "C03", color: Green, bearing: Right, distance_min_cm: MID_MIN_CM, distance_max_cm: MID_MAX_CM, description: "Green, mid right" },
    CommandCase { code: "C04", color: Red, bearing: Right, distance_min_cm: MID_MIN_CM, distance_max_cm: MID_MAX_CM, description: "Red, mid right" },
    CommandCase { code: "C09", color: Green, bearing: Left, distance_min_cm: MID_MIN_CM, distance_max_cm: MID_MAX_CM, description: "Green, mid left" },
    CommandCase { code: "C10", color: Red, bearing: Left, distance_min_cm: MID_MIN_CM, distance_max_cm: MID_MAX_CM, description: "Red, mid left" },
    // Far zone.
    CommandCase { code: "C05", color: Green, bearing: Right, distance_min_cm: FAR_MIN_CM, distance_max_cm: FAR_MAX_CM, description: "Green, far right" },
    CommandCase { code: "C06", color: Red, bearing: Right, distance_min_cm: FAR_MIN_CM, distance_max_cm: FAR_MAX_CM, description: "Red, far right" },
    CommandCase { code: "C37", color: Green, bearing: Left, distance_min_cm: FAR_MIN_CM, distance_max_cm: FAR_MAX_CM, description: "Green, far left" },
    CommandCase { code: "C38", color: Red, bearing: Left, distance_min_cm: FAR_MIN_CM, distance_max_cm: FAR_MAX_CM, description: "Red, far left" },
];

/// All dual-object cases, keyed by (primary color/bearing, secondary
/// color/bearing).
pub const DUAL_CASES: [DualCase; 16] = [
    // Primary near-left.
    DualCase { code: "C13", primary_color: Green, primary_bearing: Left, secondary_color: Green, secondary_bearing: Right, description: "Green near left + green far right" },
    DualCase { code: "C14", primary_color: Green, primary_bearing: Left, secondary_color: Red, secondary_bearing: Right, description: "Green near left + red far right" },
    DualCase { code: "C15", primary_color: Red, primary_bearing: Left, secondary_color: Green, secondary_bearing: Right, description: "Red near left + green far right" },
    DualCase { code: "C18", primary_color: Red, primary_bearing: Left, secondary_color: Red, secondary_bearing: Right, description: "Red near left + red far right" },
    DualCase { code: "C31", primary_color: Green, primary_bearing: Left, secondary_color: Green, secondary_bearing: Left, description: "Green near left + green far left" },
    DualCase { code: "C32", primary_color: Green, primary_bearing: Left, secondary_color: Red, secondary_bearing: Left, description: "Green near left + red far left" },
    DualCase { code: "C33", primary_color: Red, primary_bearing: Left, secondary_color: Green, secondary_bearing: Left, description: "Red near left + green far left" },
    DualCase { code: "C36", primary_color: Red, primary_bearing: Left, secondary_color: Red, secondary_bearing: Left, description: "Red near left + red far left" },
    // Primary near-right.
    DualCase { code: "C19", primary_color: Green, primary_bearing: Right, secondary_color: Green, secondary_bearing: Left, description: "Green near right + green far left" },
    DualCase { code: "C20", primary_color: Green, primary_bearing: Right, secondary_color: Red, secondary_bearing: Left, description: "Green near right + red far left" },
    DualCase { code: "C21", primary_color: Red, primary_bearing: Right, secondary_color: Green, secondary_bearing: Left, description: "Red near right + green far left" },
    DualCase { code: "C24", primary_color: Red, primary_bearing: Right, secondary_color: Red, secondary_bearing: Left, description: "Red near right + red far left" },
    DualCase { code: "C25", primary_color: Green, primary_bearing: Right, secondary_color: Green, secondary_bearing: Right, description: "Green near right + green far right" },
    DualCase { code: "C26", primary_color: Green, primary_bearing: Right, secondary_color: Red, secondary_bearing: Right, description: "Green near right + red far right" },
    DualCase { code: "C27", primary_color: Red, primary_bearing: Right, secondary_color: Green, secondary_bearing: Right, description: "Red near right + green far right" },
    DualCase { code: "C30", primary_color: Red, primary_bearing: Right, secondary_color: Red, secondary_bearing: Right, description: "Red near right + red far right" },
];

/// A resolved command token ready for stabilization and dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    /// A case code from the single or dual table ("C01".."C38").
    Case(&'static str),
    /// The raw color,distance,bearing encoding of the legacy firmware.
    Pilar {
        color: TargetColor,
        distance_cm: u32,
        bearing: Bearing,
    },
    /// Sentinel: nothing to act on.
    NoDetection,
}

impl Command {
    /// The wire token, without the newline terminator.
    pub fn token(&self) -> String {
        match self {
            Command::Case(code) => (*code).to_string(),
            Command::Pilar {
                color,
                distance_cm,
                bearing,
            } => format!("{},{},{}", color.code(), distance_cm, bearing.code()),
            Command::NoDetection => NO_DETECTION_CODE.to_string(),
        }
    }
}

/// How one frame's resolution came about; the note travels with the command
/// for logging and operator display.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub command: Command,
    pub note: String,
}

/// Looks up the single-object table. No match resolves to the sentinel.
pub fn resolve_single(color: TargetColor, bearing: Bearing, distance_cm: u32) -> Resolved {
    match SINGLE_CASES
        .iter()
        .find(|case| case.matches(color, bearing, distance_cm))
    {
        Some(case) => Resolved {
            command: Command::Case(case.code),
            note: case.description.to_string(),
        },
        None => Resolved {
            command: Command::NoDetection,
            note: format!(
                "no case for {}, {}, {}cm",
                color.name(),
                bearing.code(),
                distance_cm
            ),
        },
    }
}

/// Resolves a dual detection. Invalid dual geometry or a table miss falls
/// back to resolving the primary alone.
pub fn resolve_dual(
    primary: (TargetColor, Bearing, u32),
    secondary: (TargetColor, Bearing, u32),
) -> Resolved {
    let (p_color, p_bearing, p_distance) = primary;
    let (s_color, s_bearing, s_distance) = secondary;

    if !in_near_zone(p_distance) || !in_far_zone(s_distance) {
        let mut fallback = resolve_single(p_color, p_bearing, p_distance);
        fallback.note = format!("dual geometry invalid, using primary: {}", fallback.note);
        return fallback;
    }

    let matched = DUAL_CASES.iter().find(|case| {
        case.primary_color == p_color
            && case.primary_bearing == p_bearing
            && case.secondary_color == s_color
            && case.secondary_bearing == s_bearing
    });

    match matched {
        Some(case) => Resolved {
            command: Command::Case(case.code),
            note: case.description.to_string(),
        },
        None => {
            let mut fallback = resolve_single(p_color, p_bearing, p_distance);
            fallback.note = format!("no dual case, using primary: {}", fallback.note);
            fallback
        }
    }
}

/// Looks a code up across both tables for display purposes.
pub fn describe(code: &str) -> Option<&'static str> {
    SINGLE_CASES
        .iter()
        .find(|c| c.code == code)
        .map(|c| c.description)
        .or_else(|| {
            DUAL_CASES
                .iter()
                .find(|c| c.code == code)
                .map(|c| c.description)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn codes_are_unique_across_both_tables() {
        let mut seen = HashSet::new();
        for case in &SINGLE_CASES {
            assert!(seen.insert(case.code), "duplicate code {}", case.code);
        }
        for case in &DUAL_CASES {
            assert!(seen.insert(case.code), "duplicate code {}", case.code);
        }
        assert!(!seen.contains(NO_DETECTION_CODE));
    }

    #[test]
    fn zones_do_not_overlap() {
        for d in 0..=200 {
            let zones =
                [in_near_zone(d), in_mid_zone(d), in_far_zone(d)].iter().filter(|&&z| z).count();
            assert!(zones <= 1, "distance {d} is in {zones} zones");
        }
    }

    #[test]
    fn every_single_case_resolves_to_its_own_code() {
        for case in &SINGLE_CASES {
            let midpoint = (case.distance_min_cm + case.distance_max_cm) / 2;
            let resolved = resolve_single(case.color, case.bearing, midpoint);
            assert_eq!(resolved.command, Command::Case(case.code));
        }
    }

    #[test]
    fn zone_gaps_resolve_to_the_sentinel() {
        // 70cm sits between the near and mid zones.
        let resolved = resolve_single(Green, Left, 70);
        assert_eq!(resolved.command, Command::NoDetection);
        // Magenta has no single-object case at any distance.
        let magenta = resolve_single(TargetColor::Magenta, Left, 50);
        assert_eq!(magenta.command, Command::NoDetection);
    }

    #[test]
    fn valid_dual_geometry_hits_the_dual_table() {
        let resolved = resolve_dual((Red, Left, 50), (Green, Right, 120));
        assert_eq!(resolved.command, Command::Case("C15"));
    }

    #[test]
    fn primary_outside_near_zone_falls_back_to_single() {
        // Same pattern as C15 but the primary sits in the mid zone, so the
        // resolver must use the primary's single-object case instead.
        let resolved = resolve_dual((Red, Left, 90), (Green, Right, 120));
        assert_eq!(resolved.command, Command::Case("C10"));
        assert!(resolved.note.contains("dual geometry invalid"));
    }

    #[test]
    fn dual_table_miss_falls_back_to_single() {
        // Magenta never appears in the dual table; geometry is valid.
        let resolved = resolve_dual((Green, Left, 50), (TargetColor::Magenta, Right, 120));
        assert_eq!(resolved.command, Command::Case("C07"));
        assert!(resolved.note.contains("no dual case"));
    }

    #[test]
    fn pilar_token_encodes_color_distance_bearing() {
        let command = Command::Pilar {
            color: Green,
            distance_cm: 45,
            bearing: Left,
        };
        assert_eq!(command.token(), "G,45,L");
        assert_eq!(Command::NoDetection.token(), "N");
        assert_eq!(Command::Case("C01").token(), "C01");
    }

    #[test]
    fn describe_covers_both_tables() {
        assert_eq!(describe("C01"), Some("Green, near right"));
        assert_eq!(describe("C30"), Some("Red near right + red far right"));
        assert_eq!(describe("C99"), None);
    }
}
