//! Static per-floor configuration for the unit ledger.
//!
//! The legacy app carried one hand-edited screen per floor, each with its
//! own copy of the ledger logic and a hardcoded default-unit table. Here
//! the ledger is generic and the floors are plain data: an opaque storage
//! key (preserved verbatim, including the inconsistent `lower_ground_floor`
//! spelling), a unit-numbering scheme, and the seed units created on first
//! load of an empty floor.

/// How a floor formats and derives its unit numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberingScheme {
    /// Bare integers: "501", "802". `base` is used when the floor has no
    /// units yet (base 800 yields "801").
    Plain { base: u32 },
    /// Zero-padded with a prefix: "LG01".."LG31".
    Prefixed {
        prefix: &'static str,
        width: usize,
        base: u32,
    },
}

impl NumberingScheme {
    /// Derive the next unit number from the existing unit numbers.
    ///
    /// Strips non-digits from every existing number, takes the numeric
    /// maximum (not the last list entry, which breaks after deletions or
    /// out-of-order inserts), adds one, and re-applies the display format.
    pub fn next_unit_no<'a, I>(&self, existing: I) -> String
    where
        I: IntoIterator<Item = &'a str>,
    {
        let base = match self {
            NumberingScheme::Plain { base } => *base,
            NumberingScheme::Prefixed { base, .. } => *base,
        };
        let max = existing
            .into_iter()
            .map(|no| {
                let digits: String = no.chars().filter(|c| c.is_ascii_digit()).collect();
                digits.parse::<u32>().unwrap_or(0)
            })
            .max()
            .unwrap_or(base)
            .max(base);
        let next = max + 1;

        match self {
            NumberingScheme::Plain { .. } => next.to_string(),
            NumberingScheme::Prefixed { prefix, width, .. } => {
                format!("{prefix}{next:0width$}", width = *width)
            }
        }
    }
}

/// One floor's ledger configuration.
pub struct FloorConfig {
    /// Opaque storage key. Must stay byte-for-byte compatible with data
    /// written by earlier versions, so it is never normalized.
    pub floor_key: &'static str,
    /// Human-readable name used by the presenter.
    pub title: &'static str,
    pub numbering: NumberingScheme,
    /// `(unit_no, area)` pairs inserted in order on first load.
    pub seed: &'static [(&'static str, f64)],
}

const EIGHTH_FLOOR_SEED: &[(&str, f64)] = &[
    ("801", 357.0),
    ("802", 1067.0),
    ("803", 1066.0),
    ("804", 1042.0),
    ("805", 607.0),
    ("806", 652.0),
    ("807", 500.0),
    ("808", 500.0),
    ("809", 500.0),
    ("810", 500.0),
    ("811", 698.0),
    ("812", 891.0),
    ("813", 799.0),
    ("814", 787.0),
    ("815", 770.0),
    ("816", 781.0),
    ("817", 789.0),
    ("818", 943.0),
    ("819", 428.0),
    ("820", 469.0),
    ("821", 375.0),
    ("822", 301.0),
    ("823", 915.0),
    ("824", 1027.0),
    ("825", 846.0),
    ("826", 846.0),
    ("827", 1187.0),
    ("828", 1187.0),
];

const FIFTH_FLOOR_SEED: &[(&str, f64)] = &[
    ("501", 929.0),
    ("502", 649.0),
    ("503", 842.0),
    ("504", 796.0),
    ("505", 650.0),
    ("506", 650.0),
    ("507", 796.0),
    ("508", 796.0),
    ("509", 683.0),
    ("510", 883.0),
    ("511", 719.0),
    ("512", 666.0),
    ("513", 593.0),
    ("514", 628.0),
    ("515", 628.0),
    ("516", 711.0),
    ("517", 625.0),
    ("518", 786.0),
    ("519", 754.0),
    ("520", 714.0),
    ("521", 893.0),
    ("522", 671.0),
    ("523", 670.0),
    ("524", 854.0),
    ("525", 800.0),
    ("526", 512.0),
    ("527", 599.0),
    ("528", 915.0),
];

const LOWER_GROUND_SEED: &[(&str, f64)] = &[
    ("LG01", 275.0),
    ("LG02", 329.0),
    ("LG03", 329.0),
    ("LG04", 199.0),
    ("LG05", 273.0),
    ("LG06", 612.0),
    ("LG07", 474.0),
    ("LG08", 752.0),
    ("LG09", 505.0),
    ("LG10", 485.0),
    ("LG11", 479.0),
    ("LG12", 497.0),
    ("LG13", 470.0),
    ("LG14", 453.0),
    ("LG15", 453.0),
    ("LG16", 470.0),
    ("LG17", 270.0),
    ("LG18", 617.0),
    ("LG19", 506.0),
    ("LG20", 385.0),
    ("LG21", 385.0),
    ("LG22", 407.0),
    ("LG23", 401.0),
    ("LG24", 302.0),
    ("LG25", 461.0),
    ("LG26", 296.0),
    ("LG27", 292.0),
    ("LG28", 292.0),
    ("LG29", 327.0),
    ("LG30", 773.0),
    ("LG31", 615.0),
];

/// All managed floors. Floors without a recorded unit table start empty
/// and get their units entered manually.
pub const FLOORS: &[FloorConfig] = &[
    FloorConfig {
        floor_key: "lower_ground_floor",
        title: "Lower Ground Floor",
        numbering: NumberingScheme::Prefixed {
            prefix: "LG",
            width: 2,
            base: 0,
        },
        seed: LOWER_GROUND_SEED,
    },
    FloorConfig {
        floor_key: "GroundFloor",
        title: "Ground Floor",
        numbering: NumberingScheme::Plain { base: 0 },
        seed: &[],
    },
    FloorConfig {
        floor_key: "FirstFloor",
        title: "First Floor",
        numbering: NumberingScheme::Plain { base: 100 },
        seed: &[],
    },
    FloorConfig {
        floor_key: "SecondFloor",
        title: "Second Floor",
        numbering: NumberingScheme::Plain { base: 200 },
        seed: &[],
    },
    FloorConfig {
        floor_key: "ThirdFloor",
        title: "Third Floor",
        numbering: NumberingScheme::Plain { base: 300 },
        seed: &[],
    },
    FloorConfig {
        floor_key: "FourthFloor",
        title: "Fourth Floor",
        numbering: NumberingScheme::Plain { base: 400 },
        seed: &[],
    },
    FloorConfig {
        floor_key: "FifthFloor",
        title: "Fifth Floor",
        numbering: NumberingScheme::Plain { base: 500 },
        seed: FIFTH_FLOOR_SEED,
    },
    FloorConfig {
        floor_key: "SixthFloor",
        title: "Sixth Floor",
        numbering: NumberingScheme::Plain { base: 600 },
        seed: &[],
    },
    FloorConfig {
        floor_key: "SeventhFloor",
        title: "Seventh Floor",
        numbering: NumberingScheme::Plain { base: 700 },
        seed: &[],
    },
    FloorConfig {
        floor_key: "EighthFloor",
        title: "Eighth Floor",
        numbering: NumberingScheme::Plain { base: 800 },
        seed: EIGHTH_FLOOR_SEED,
    },
    FloorConfig {
        floor_key: "NinthFloor",
        title: "Ninth Floor",
        numbering: NumberingScheme::Plain { base: 900 },
        seed: &[],
    },
];

/// Look up a floor by its storage key.
pub fn floor_config(floor_key: &str) -> Option<&'static FloorConfig> {
    FLOORS.iter().find(|f| f.floor_key == floor_key)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_scheme_uses_numeric_maximum_not_list_order() {
        let scheme = NumberingScheme::Plain { base: 800 };
        // "828" is the highest even though it is not last
        let next = scheme.next_unit_no(["801", "828", "802"]);
        assert_eq!(next, "829");
    }

    #[test]
    fn plain_scheme_falls_back_to_base_when_empty() {
        let scheme = NumberingScheme::Plain { base: 500 };
        assert_eq!(scheme.next_unit_no([]), "501");
    }

    #[test]
    fn prefixed_scheme_pads_and_prefixes() {
        let scheme = NumberingScheme::Prefixed {
            prefix: "LG",
            width: 2,
            base: 0,
        };
        let existing: Vec<String> = (1..=31).map(|n| format!("LG{n:02}")).collect();
        let next = scheme.next_unit_no(existing.iter().map(String::as_str));
        assert_eq!(next, "LG32");
    }

    #[test]
    fn prefixed_scheme_starts_at_01_when_empty() {
        let scheme = NumberingScheme::Prefixed {
            prefix: "LG",
            width: 2,
            base: 0,
        };
        assert_eq!(scheme.next_unit_no([]), "LG01");
    }

    #[test]
    fn unparseable_numbers_count_as_zero() {
        let scheme = NumberingScheme::Plain { base: 0 };
        assert_eq!(scheme.next_unit_no(["kiosk", "3"]), "4");
    }

    #[test]
    fn all_floor_keys_are_unique() {
        for (i, a) in FLOORS.iter().enumerate() {
            for b in &FLOORS[i + 1..] {
                assert_ne!(a.floor_key, b.floor_key);
            }
        }
    }

    #[test]
    fn legacy_floor_keys_are_preserved_verbatim() {
        assert!(floor_config("lower_ground_floor").is_some());
        assert!(floor_config("EighthFloor").is_some());
        assert!(floor_config("FifthFloor").is_some());
        assert!(floor_config("lowerGroundFloor").is_none());
    }

    #[test]
    fn seed_tables_match_recorded_sizes() {
        assert_eq!(floor_config("EighthFloor").unwrap().seed.len(), 28);
        assert_eq!(floor_config("FifthFloor").unwrap().seed.len(), 28);
        assert_eq!(floor_config("lower_ground_floor").unwrap().seed.len(), 31);
    }
}
