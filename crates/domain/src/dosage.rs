//! Dosage — an amount and a unit, e.g. `100 mg` or `1 tablet`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PillminderError, ValidationError};

/// How much of a medicine to take per occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dosage {
    pub amount: f64,
    pub unit: String,
}

impl Dosage {
    /// Build a dosage and check it.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDosage`] when the amount is not a
    /// positive finite number or the unit is blank.
    pub fn new(amount: f64, unit: impl Into<String>) -> Result<Self, PillminderError> {
        let dosage = Self {
            amount,
            unit: unit.into().trim().to_string(),
        };
        dosage.validate()?;
        Ok(dosage)
    }

    /// Check invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDosage`] on a non-positive or
    /// non-finite amount, or an empty unit.
    pub fn validate(&self) -> Result<(), PillminderError> {
        if !self.amount.is_finite() || self.amount <= 0.0 || self.unit.trim().is_empty() {
            return Err(ValidationError::InvalidDosage(self.to_string()).into());
        }
        Ok(())
    }
}

impl fmt::Display for Dosage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.unit)
    }
}

impl FromStr for Dosage {
    type Err = PillminderError;

    /// Parse `"100mg"`, `"2.5 ml"`, or `"1 tablet"`. A comma is accepted as
    /// the decimal separator.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let split = text
            .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
            .unwrap_or(text.len());
        let (number, unit) = text.split_at(split);

        let amount: f64 = number
            .replace(',', ".")
            .parse()
            .map_err(|_| ValidationError::InvalidDosage(s.to_string()))?;

        Self::new(amount, unit).map_err(|_| ValidationError::InvalidDosage(s.to_string()).into())
    }
}
