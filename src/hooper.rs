//! Hooper Index
//!
//! Unweighted sum of five 1-7 subjective ratings (sleep quality, fatigue,
//! soreness, stress, mood), lower is better, range 5-35. The index is banded
//! into readiness tiers and can be cross-referenced with the current TSB tier
//! to separate training fatigue from non-training stress.

use crate::error::ValidationError;
use crate::models::SubjectiveRatings;
use crate::pmc::TsbTier;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 7;

/// Validated set of five Hooper ratings.
///
/// Deserializes from a flat ratings object and rejects values outside 1-7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SubjectiveRatings", into = "SubjectiveRatings")]
pub struct HooperRecord {
    ratings: SubjectiveRatings,
}

impl HooperRecord {
    /// Build a record, rejecting ratings outside 1-7
    pub fn new(ratings: SubjectiveRatings) -> Result<Self, ValidationError> {
        let names = ["sleep_quality", "fatigue", "soreness", "stress", "mood"];
        for (name, value) in names.iter().zip(ratings.as_array()) {
            if !(MIN_RATING..=MAX_RATING).contains(&value) {
                return Err(ValidationError::OutOfRange {
                    field: name.to_string(),
                    value: value as f64,
                    min: MIN_RATING as f64,
                    max: MAX_RATING as f64,
                });
            }
        }
        Ok(HooperRecord { ratings })
    }

    pub fn ratings(&self) -> &SubjectiveRatings {
        &self.ratings
    }

    /// Sum of the five ratings, 5-35
    pub fn index(&self) -> u8 {
        let sum: u16 = self.ratings.as_array().iter().map(|&r| r as u16).sum();
        sum.min(u8::MAX as u16) as u8
    }

    pub fn band(&self) -> HooperBand {
        HooperBand::from_index(self.index())
    }
}

impl TryFrom<SubjectiveRatings> for HooperRecord {
    type Error = ValidationError;

    fn try_from(ratings: SubjectiveRatings) -> Result<Self, Self::Error> {
        HooperRecord::new(ratings)
    }
}

impl From<HooperRecord> for SubjectiveRatings {
    fn from(record: HooperRecord) -> Self {
        record.ratings
    }
}

/// Readiness tier of a Hooper Index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HooperBand {
    /// 10 or less
    Excellent,
    /// 11-15
    Good,
    /// 16-20
    Moderate,
    /// 21-25
    High,
    /// Above 25
    Critical,
}

impl HooperBand {
    pub fn from_index(index: u8) -> Self {
        match index {
            0..=10 => HooperBand::Excellent,
            11..=15 => HooperBand::Good,
            16..=20 => HooperBand::Moderate,
            21..=25 => HooperBand::High,
            _ => HooperBand::Critical,
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            HooperBand::Excellent => "Excellent readiness: ready for high-intensity training",
            HooperBand::Good => "Good readiness: proceed with planned training",
            HooperBand::Moderate => "Moderate strain: consider reducing intensity today",
            HooperBand::High => "High strain: favour light recovery work",
            HooperBand::Critical => "Critical strain: rest and review sleep, stress and health",
        }
    }

    /// High and Critical bands
    pub fn is_poor(&self) -> bool {
        matches!(self, HooperBand::High | HooperBand::Critical)
    }

    /// Excellent and Good bands
    pub fn is_good(&self) -> bool {
        matches!(self, HooperBand::Excellent | HooperBand::Good)
    }
}

impl fmt::Display for HooperBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HooperBand::Excellent => write!(f, "Excellent"),
            HooperBand::Good => write!(f, "Good"),
            HooperBand::Moderate => write!(f, "Moderate"),
            HooperBand::High => write!(f, "High"),
            HooperBand::Critical => write!(f, "Critical"),
        }
    }
}

/// Advisory combining subjective state with training stress balance
pub fn combined_advisory(band: HooperBand, tsb_tier: TsbTier) -> &'static str {
    if band.is_poor() {
        if tsb_tier.is_fatigued() {
            "Expected fatigue from accumulated training load: rest and recover"
        } else {
            "Feeling poor despite manageable training load: investigate non-training stressors (sleep, work, illness)"
        }
    } else if band.is_good() {
        match tsb_tier {
            TsbTier::Fresh => "Fresh and feeling good: well suited for a key session or race",
            TsbTier::High | TsbTier::Critical => {
                "Feeling good despite heavy load: monitor closely for delayed fatigue"
            }
            _ => "Feeling good with a productive load: continue planned training",
        }
    } else if tsb_tier.is_fatigued() {
        "Fatigue is building: reduce intensity over the next days"
    } else {
        "Continue planned training and monitor how you feel"
    }
}

/// Hooper index, band and TSB cross-reference for one check-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HooperAssessment {
    pub index: u8,
    pub band: HooperBand,
    pub recommendation: String,
    pub tsb: f64,
    pub tsb_tier: TsbTier,
    pub advisory: String,
}

impl HooperAssessment {
    pub fn new(record: &HooperRecord, tsb: f64) -> Self {
        let band = record.band();
        let tsb_tier = TsbTier::from_tsb(tsb);

        HooperAssessment {
            index: record.index(),
            band,
            recommendation: band.recommendation().to_string(),
            tsb,
            tsb_tier,
            advisory: combined_advisory(band, tsb_tier).to_string(),
        }
    }
}
