// 🧒👴 Age Bands - fixed classification of residents by age
// Lower bounds are inclusive; every u32 age maps to exactly one band

use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AgeBand {
    /// 0-4
    Children,
    /// 5-9
    Childhood,
    /// 10-19
    Adolescents,
    /// 20-59
    Adults,
    /// 60+
    Elderly,
}

impl AgeBand {
    /// All bands in ascending age order
    pub const ALL: [AgeBand; 5] = [
        AgeBand::Children,
        AgeBand::Childhood,
        AgeBand::Adolescents,
        AgeBand::Adults,
        AgeBand::Elderly,
    ];

    pub fn from_age(age: u32) -> Self {
        match age {
            0..=4 => AgeBand::Children,
            5..=9 => AgeBand::Childhood,
            10..=19 => AgeBand::Adolescents,
            20..=59 => AgeBand::Adults,
            _ => AgeBand::Elderly,
        }
    }

    /// Report label, as printed in the UBS spreadsheets
    pub fn label(&self) -> &'static str {
        match self {
            AgeBand::Children => "0 a 4 anos (Crianças)",
            AgeBand::Childhood => "5 a 9 anos (Infância)",
            AgeBand::Adolescents => "10 a 19 anos (Adolescentes)",
            AgeBand::Adults => "20 a 59 anos (Adultos)",
            AgeBand::Elderly => "60 anos ou mais (Idosos)",
        }
    }

    /// Compact label for chart axes
    pub fn short_label(&self) -> &'static str {
        match self {
            AgeBand::Children => "0-4",
            AgeBand::Childhood => "5-9",
            AgeBand::Adolescents => "10-19",
            AgeBand::Adults => "20-59",
            AgeBand::Elderly => "60+",
        }
    }

    /// Inclusive lower bound of the band
    pub fn lower_bound(&self) -> u32 {
        match self {
            AgeBand::Children => 0,
            AgeBand::Childhood => 5,
            AgeBand::Adolescents => 10,
            AgeBand::Adults => 20,
            AgeBand::Elderly => 60,
        }
    }
}

// Serialized as the report label
impl Serialize for AgeBand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl fmt::Display for AgeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_boundaries() {
        assert_eq!(AgeBand::from_age(0), AgeBand::Children);
        assert_eq!(AgeBand::from_age(4), AgeBand::Children);
        assert_eq!(AgeBand::from_age(5), AgeBand::Childhood);
        assert_eq!(AgeBand::from_age(9), AgeBand::Childhood);
        assert_eq!(AgeBand::from_age(10), AgeBand::Adolescents);
        assert_eq!(AgeBand::from_age(19), AgeBand::Adolescents);
        assert_eq!(AgeBand::from_age(20), AgeBand::Adults);
        assert_eq!(AgeBand::from_age(59), AgeBand::Adults);
        assert_eq!(AgeBand::from_age(60), AgeBand::Elderly);
        assert_eq!(AgeBand::from_age(u32::MAX), AgeBand::Elderly);
    }

    #[test]
    fn test_lower_bounds_are_inclusive() {
        for band in AgeBand::ALL {
            assert_eq!(AgeBand::from_age(band.lower_bound()), band);
        }
    }

    #[test]
    fn test_classification_is_total_and_ordered() {
        let mut previous = AgeBand::Children;
        for age in 0..=130 {
            let band = AgeBand::from_age(age);
            assert!(band >= previous, "bands must not go backwards at age {}", age);
            previous = band;
        }
        assert_eq!(previous, AgeBand::Elderly);
    }

    #[test]
    fn test_elderly_label() {
        assert_eq!(AgeBand::from_age(60).label(), "60 anos ou mais (Idosos)");
        assert_eq!(AgeBand::Elderly.to_string(), "60 anos ou mais (Idosos)");
        assert_eq!(
            serde_json::to_string(&AgeBand::Elderly).unwrap(),
            "\"60 anos ou mais (Idosos)\""
        );
    }
}
