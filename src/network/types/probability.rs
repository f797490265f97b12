use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for probability operations
#[derive(Debug, Error, PartialEq)]
pub enum ProbabilityError {
    /// Returned when a probability value is out of the valid range (0.0-1.0)
    #[error("{0} is not in the valid probability range of 0.0 to 1.0")]
    OutOfRange(f64),

    /// Returned when a string can't be parsed as a valid float
    #[error("'{0}' is not a valid number for a probability value")]
    ParseError(String),
}

/// A chance between 0.0 (never) and 1.0 (always).
///
/// Deserialization goes through [`Probability::new`], so a configuration file
/// can never smuggle in an out-of-range value.
///
/// ```
/// use snarl::network::types::probability::Probability;
///
/// let p = Probability::new(0.5).unwrap();
/// assert_eq!(p.value(), 0.5);
/// assert!(Probability::new(1.5).is_err());
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Probability(f64);

impl Probability {
    /// A probability of 1.0.
    pub const ALWAYS: Probability = Probability(1.0);

    /// Creates a probability, rejecting values outside 0.0..=1.0 (and NaN).
    pub fn new(value: f64) -> Result<Self, ProbabilityError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(ProbabilityError::OutOfRange(value));
        }

        Ok(Probability(value))
    }

    /// Creates a probability from a percentage, clamping into 0..=100.
    ///
    /// NaN maps to 0.
    pub fn from_percent(percent: f64) -> Self {
        Self::clamped(percent / 100.0)
    }

    /// Creates a probability, clamping into 0.0..=1.0. NaN maps to 0.0.
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            return Probability(0.0);
        }
        Probability(value.clamp(0.0, 1.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn as_percent(&self) -> f64 {
        self.0 * 100.0
    }

    /// Draws once from `rng`; true with this probability.
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        rng.random_bool(self.0)
    }
}

impl TryFrom<f64> for Probability {
    type Error = ProbabilityError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Probability::new(value)
    }
}

impl FromStr for Probability {
    type Err = ProbabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| ProbabilityError::ParseError(s.to_string()))?;
        Probability::new(value)
    }
}

impl From<Probability> for f64 {
    fn from(prob: Probability) -> Self {
        prob.0
    }
}

impl fmt::Display for Probability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_valid_probability() {
        let p = Probability::new(0.5).unwrap();
        assert_eq!(p.value(), 0.5);
        assert_eq!(p.as_percent(), 50.0);
    }

    #[test]
    fn test_invalid_probability() {
        assert!(Probability::new(-0.1).is_err());
        assert!(Probability::new(1.1).is_err());
        assert!(Probability::new(f64::NAN).is_err());
    }

    #[test]
    fn test_from_string() {
        let p = " 0.75".parse::<Probability>().unwrap();
        assert_eq!(p.value(), 0.75);

        assert_eq!(
            "not_a_number".parse::<Probability>(),
            Err(ProbabilityError::ParseError("not_a_number".to_string()))
        );
        assert!("1.5".parse::<Probability>().is_err());
    }

    #[test]
    fn test_clamping_constructors() {
        assert_eq!(Probability::from_percent(25.0).value(), 0.25);
        assert_eq!(Probability::from_percent(250.0).value(), 1.0);
        assert_eq!(Probability::from_percent(-5.0).value(), 0.0);
        assert_eq!(Probability::clamped(f64::NAN).value(), 0.0);
    }

    #[test]
    fn test_roll_extremes() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!((0..100).all(|_| Probability::ALWAYS.roll(&mut rng)));
        assert!((0..100).all(|_| !Probability::default().roll(&mut rng)));
    }

    #[test]
    fn test_serde_rejects_out_of_range() {
        #[derive(Debug, Deserialize)]
        struct Wrapper {
            chance: Probability,
        }

        let ok: Wrapper = toml::from_str("chance = 0.3").unwrap();
        assert_eq!(ok.chance.value(), 0.3);
        assert!(toml::from_str::<Wrapper>("chance = 3.0").is_err());
    }

    #[test]
    fn test_display() {
        let p = Probability::new(0.25).unwrap();
        assert_eq!(format!("{}", p), "0.25");
    }
}
