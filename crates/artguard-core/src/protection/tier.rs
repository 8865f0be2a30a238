//! Verification tiers derived from how many layers were protected.

use crate::error::{ArtguardError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete trust level, ordered `None < Basic < Standard < Forensic < Perfect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationTier {
    None,
    Basic,
    Standard,
    Forensic,
    Perfect,
}

impl VerificationTier {
    /// Confidence percentage shown alongside the tier.
    pub fn confidence_percent(self) -> u8 {
        match self {
            VerificationTier::Perfect => 100,
            VerificationTier::Forensic => 95,
            VerificationTier::Standard => 80,
            VerificationTier::Basic => 60,
            VerificationTier::None => 0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VerificationTier::Perfect => "Perfect",
            VerificationTier::Forensic => "Forensic",
            VerificationTier::Standard => "Standard",
            VerificationTier::Basic => "Basic",
            VerificationTier::None => "None",
        }
    }
}

impl fmt::Display for VerificationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An exact fraction of the total layer count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fraction {
    pub numerator: u32,
    pub denominator: u32,
}

impl Fraction {
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Smallest layer count that reaches this fraction of `total`.
    pub fn ceil_of(&self, total: usize) -> usize {
        let den = self.denominator.max(1) as usize;
        (total * self.numerator as usize).div_ceil(den)
    }

    fn as_f64(&self) -> f64 {
        f64::from(self.numerator) / f64::from(self.denominator.max(1))
    }
}

/// Tuned thresholds for tier assignment.
///
/// Perfect always needs every layer. Forensic and Standard are fractions of
/// the total; Basic needs a fixed minimum number of layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    pub basic_min_layers: usize,
    pub forensic: Fraction,
    pub standard: Fraction,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            basic_min_layers: 2,
            forensic: Fraction::new(2, 3),
            standard: Fraction::new(1, 3),
        }
    }
}

impl TierThresholds {
    /// Derives the tier for `protected` out of `total` layers.
    ///
    /// Total and non-decreasing in `protected`. Counts above `total` are clamped.
    pub fn tier_for(&self, protected: usize, total: usize) -> VerificationTier {
        if total == 0 {
            return VerificationTier::None;
        }
        let protected = protected.min(total);

        if protected >= total {
            VerificationTier::Perfect
        } else if protected >= self.forensic.ceil_of(total) {
            VerificationTier::Forensic
        } else if protected >= self.standard.ceil_of(total) {
            VerificationTier::Standard
        } else if protected >= self.basic_min_layers {
            VerificationTier::Basic
        } else {
            VerificationTier::None
        }
    }

    /// Minimum protected layers needed for `tier` with `total` layers.
    pub fn required_for(&self, tier: VerificationTier, total: usize) -> usize {
        match tier {
            VerificationTier::Perfect => total,
            VerificationTier::Forensic => self.forensic.ceil_of(total),
            VerificationTier::Standard => self.standard.ceil_of(total),
            VerificationTier::Basic => self.basic_min_layers,
            VerificationTier::None => 0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, fraction) in [("forensic", self.forensic), ("standard", self.standard)] {
            if fraction.denominator == 0 || fraction.numerator > fraction.denominator {
                return Err(ArtguardError::config(format!(
                    "tier threshold '{}' must be a fraction in [0, 1], got {}/{}",
                    name, fraction.numerator, fraction.denominator
                )));
            }
        }
        if self.standard.as_f64() > self.forensic.as_f64() {
            return Err(ArtguardError::config(
                "standard tier threshold must not exceed the forensic threshold",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_thresholds_for_eighteen_layers() {
        let thresholds = TierThresholds::default();
        assert_eq!(thresholds.tier_for(18, 18), VerificationTier::Perfect);
        assert_eq!(thresholds.tier_for(17, 18), VerificationTier::Forensic);
        assert_eq!(thresholds.tier_for(12, 18), VerificationTier::Forensic);
        assert_eq!(thresholds.tier_for(11, 18), VerificationTier::Standard);
        assert_eq!(thresholds.tier_for(6, 18), VerificationTier::Standard);
        assert_eq!(thresholds.tier_for(5, 18), VerificationTier::Basic);
        assert_eq!(thresholds.tier_for(2, 18), VerificationTier::Basic);
        assert_eq!(thresholds.tier_for(1, 18), VerificationTier::None);
        assert_eq!(thresholds.tier_for(0, 18), VerificationTier::None);
    }

    #[test]
    fn test_tier_is_monotonic_for_every_matrix_size() {
        let thresholds = TierThresholds::default();
        for total in 0..=40 {
            let mut previous = VerificationTier::None;
            for protected in 0..=total + 2 {
                let tier = thresholds.tier_for(protected, total);
                assert!(
                    tier >= previous,
                    "tier dropped at {}/{}: {:?} -> {:?}",
                    protected,
                    total,
                    previous,
                    tier
                );
                previous = tier;
            }
        }
    }

    #[test]
    fn test_zero_layers_is_none() {
        assert_eq!(TierThresholds::default().tier_for(0, 0), VerificationTier::None);
    }

    #[test]
    fn test_confidence_table() {
        let confidences: Vec<u8> = [
            VerificationTier::Perfect,
            VerificationTier::Forensic,
            VerificationTier::Standard,
            VerificationTier::Basic,
            VerificationTier::None,
        ]
        .iter()
        .map(|t| t.confidence_percent())
        .collect();
        assert_eq!(confidences, vec![100, 95, 80, 60, 0]);
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let thresholds = TierThresholds {
            forensic: Fraction::new(1, 4),
            standard: Fraction::new(1, 2),
            basic_min_layers: 2,
        };
        assert!(thresholds.validate().unwrap_err().is_config());
        assert!(TierThresholds::default().validate().is_ok());
    }
}
