//! Market Mood Index scale.

use serde::{Deserialize, Serialize};

/// Gauge zone for an MMI value.
///
/// Boundaries: Extreme Fear below 30, Fear from 30 up to 50, Greed from 50
/// through 70, Extreme Greed above 70.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoodZone {
    ExtremeFear,
    Fear,
    Greed,
    ExtremeGreed,
}

impl MoodZone {
    pub const ALL: [MoodZone; 4] = [
        MoodZone::ExtremeFear,
        MoodZone::Fear,
        MoodZone::Greed,
        MoodZone::ExtremeGreed,
    ];

    pub fn from_value(value: f64) -> Self {
        if value < 30.0 {
            MoodZone::ExtremeFear
        } else if value < 50.0 {
            MoodZone::Fear
        } else if value <= 70.0 {
            MoodZone::Greed
        } else {
            MoodZone::ExtremeGreed
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MoodZone::ExtremeFear => "Extreme Fear",
            MoodZone::Fear => "Fear",
            MoodZone::Greed => "Greed",
            MoodZone::ExtremeGreed => "Extreme Greed",
        }
    }

    /// Legend range text.
    pub fn range_label(self) -> &'static str {
        match self {
            MoodZone::ExtremeFear => "<30",
            MoodZone::Fear => "30-50",
            MoodZone::Greed => "50-70",
            MoodZone::ExtremeGreed => ">70",
        }
    }

    /// Gauge span of the zone on the 0..=100 scale.
    pub fn span(self) -> (f64, f64) {
        match self {
            MoodZone::ExtremeFear => (0.0, 30.0),
            MoodZone::Fear => (30.0, 50.0),
            MoodZone::Greed => (50.0, 70.0),
            MoodZone::ExtremeGreed => (70.0, 100.0),
        }
    }
}

/// Map a volatility index close to an MMI value.
///
/// Low volatility reads as greed: 12 and below maps to 90, up to 20 maps
/// to 70, up to 30 maps to 50, anything higher maps to 30.
pub fn mmi_from_vix(vix: f64) -> f64 {
    if vix <= 12.0 {
        90.0
    } else if vix <= 20.0 {
        70.0
    } else if vix <= 30.0 {
        50.0
    } else {
        30.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vix_buckets() {
        assert_eq!(mmi_from_vix(11.5), 90.0);
        assert_eq!(mmi_from_vix(12.0), 90.0);
        assert_eq!(mmi_from_vix(14.2), 70.0);
        assert_eq!(mmi_from_vix(25.0), 50.0);
        assert_eq!(mmi_from_vix(45.0), 30.0);
    }

    #[test]
    fn zone_boundaries() {
        assert_eq!(MoodZone::from_value(0.0), MoodZone::ExtremeFear);
        assert_eq!(MoodZone::from_value(29.9), MoodZone::ExtremeFear);
        assert_eq!(MoodZone::from_value(30.0), MoodZone::Fear);
        assert_eq!(MoodZone::from_value(50.0), MoodZone::Greed);
        assert_eq!(MoodZone::from_value(70.0), MoodZone::Greed);
        assert_eq!(MoodZone::from_value(70.1), MoodZone::ExtremeGreed);
    }

    #[test]
    fn every_vix_bucket_lands_in_a_zone() {
        let zones: Vec<_> = [10.0, 15.0, 25.0, 40.0]
            .iter()
            .map(|&v| MoodZone::from_value(mmi_from_vix(v)))
            .collect();
        assert_eq!(
            zones,
            vec![
                MoodZone::ExtremeGreed,
                MoodZone::Greed,
                MoodZone::Greed,
                MoodZone::Fear
            ]
        );
    }
}
