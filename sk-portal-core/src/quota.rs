//! Gender representation quota for officer rosters.
//!
//! A roster meets the quota when at least 30% of its officers are female.
//! All comparisons are done on integers (`10 * female >= 3 * total`) so the
//! threshold is exact.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::workflow::ParseEnumError;

/// Required share of female officers, as a fraction `NUMERATOR / DENOMINATOR`.
const QUOTA_NUMERATOR: u64 = 3;
const QUOTA_DENOMINATOR: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Female => "female",
            Self::Male => "male",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "female" => Ok(Self::Female),
            "male" => Ok(Self::Male),
            other => Err(ParseEnumError {
                kind: "gender",
                value: other.to_string(),
            }),
        }
    }
}

/// Anything that can be counted towards the quota.
pub trait Gendered {
    fn gender(&self) -> Gender;
}

impl Gendered for Gender {
    fn gender(&self) -> Gender {
        *self
    }
}

/// Female and total counts for a roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuotaCount {
    pub female: u32,
    pub total: u32,
}

impl QuotaCount {
    pub fn of<O: Gendered>(officers: &[O]) -> Self {
        let female = officers
            .iter()
            .filter(|o| o.gender() == Gender::Female)
            .count();
        Self {
            female: u32::try_from(female).unwrap_or(u32::MAX),
            total: u32::try_from(officers.len()).unwrap_or(u32::MAX),
        }
    }

    /// An empty roster never meets the quota.
    pub fn is_met(&self) -> bool {
        self.total > 0
            && QUOTA_DENOMINATOR * u64::from(self.female)
                >= QUOTA_NUMERATOR * u64::from(self.total)
    }

    /// Minimum number of female officers to add so the quota is met.
    pub fn shortfall(&self) -> u32 {
        if self.total == 0 {
            return 1;
        }
        let required = QUOTA_NUMERATOR * u64::from(self.total);
        let present = QUOTA_DENOMINATOR * u64::from(self.female);
        if present >= required {
            return 0;
        }
        // Each added female officer raises the left side by 10 and the right by 3.
        let step = QUOTA_DENOMINATOR - QUOTA_NUMERATOR;
        let needed = (required - present).div_ceil(step);
        u32::try_from(needed).unwrap_or(u32::MAX)
    }

    /// Female share in percent; 0 for an empty roster.
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(self.female) * 100.0 / f64::from(self.total)
        }
    }
}

/// True when at least 30% of `officers` are female.
pub fn is_quota_met<O: Gendered>(officers: &[O]) -> bool {
    QuotaCount::of(officers).is_met()
}

/// Minimum `n` such that adding `n` female officers meets the quota.
pub fn officers_needed_for_quota<O: Gendered>(officers: &[O]) -> u32 {
    QuotaCount::of(officers).shortfall()
}

/// Submission gate: fails with [`ValidationError::QuotaNotMet`] listing the shortfall.
pub fn ensure_quota<O: Gendered>(officers: &[O]) -> Result<(), ValidationError> {
    let count = QuotaCount::of(officers);
    if count.is_met() {
        Ok(())
    } else {
        Err(ValidationError::QuotaNotMet {
            female: count.female,
            total: count.total,
            shortfall: count.shortfall(),
        })
    }
}

/// Quota figures for inline display next to the roster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuotaSummary {
    pub female: u32,
    pub total: u32,
    pub percentage: f64,
    pub met: bool,
    pub shortfall: u32,
}

impl QuotaSummary {
    pub fn of<O: Gendered>(officers: &[O]) -> Self {
        Self::from(QuotaCount::of(officers))
    }
}

impl From<QuotaCount> for QuotaSummary {
    fn from(count: QuotaCount) -> Self {
        Self {
            female: count.female,
            total: count.total,
            percentage: (count.percentage() * 10.0).round() / 10.0,
            met: count.is_met(),
            shortfall: count.shortfall(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roster(female: usize, male: usize) -> Vec<Gender> {
        let mut officers = vec![Gender::Female; female];
        officers.extend(vec![Gender::Male; male]);
        officers
    }

    #[test]
    fn test_empty_roster_not_met() {
        let officers: Vec<Gender> = vec![];
        assert!(!is_quota_met(&officers));
        assert_eq!(officers_needed_for_quota(&officers), 1);
    }

    #[test]
    fn test_two_of_ten_needs_two_more() {
        let officers = roster(2, 8);
        assert!(!is_quota_met(&officers));
        // 3/11 is 27.3%, 4/12 is 33.3%
        assert_eq!(officers_needed_for_quota(&officers), 2);
    }

    #[test]
    fn test_exact_threshold_is_met() {
        assert!(is_quota_met(&roster(3, 7)));
        assert_eq!(officers_needed_for_quota(&roster(3, 7)), 0);
        assert!(!is_quota_met(&roster(2, 5)));
    }

    #[test]
    fn test_ensure_quota_reports_shortfall() {
        let err = ensure_quota(&roster(1, 9)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::QuotaNotMet {
                female: 1,
                total: 10,
                shortfall: 3,
            }
        );
        assert!(ensure_quota(&roster(5, 5)).is_ok());
    }

    #[test]
    fn test_summary_rounds_percentage() {
        let summary = QuotaSummary::of(&roster(1, 2));
        assert_eq!(summary.percentage, 33.3);
        assert!(summary.met);
        assert_eq!(summary.shortfall, 0);
    }

    proptest! {
        /// Property: adding a female officer never lowers the share, adding a male never raises it.
        #[test]
        fn quota_is_monotonic(female in 0usize..60, male in 0usize..60) {
            let base = QuotaCount::of(&roster(female, male));
            let plus_female = QuotaCount::of(&roster(female + 1, male));
            let plus_male = QuotaCount::of(&roster(female, male + 1));

            if base.total > 0 {
                prop_assert!(plus_female.percentage() >= base.percentage());
                prop_assert!(plus_male.percentage() <= base.percentage());
            }
            prop_assert!(!base.is_met() || plus_female.is_met());
            prop_assert!(base.is_met() || !plus_male.is_met());
        }

        /// Property: the shortfall is the minimal n with (f + n) / (t + n) >= 0.3.
        #[test]
        fn shortfall_is_minimal(female in 0usize..60, male in 0usize..60) {
            let n = officers_needed_for_quota(&roster(female, male)) as usize;
            prop_assert!(is_quota_met(&roster(female + n, male)));
            if n > 0 {
                prop_assert!(!is_quota_met(&roster(female + n - 1, male)));
            }
        }
    }
}
