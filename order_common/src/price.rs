use std::{fmt::Display, ops::Add};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

//--------------------------------------        Price          ---------------------------------------------------------
/// A non-negative monetary amount, as supplied by the client.
///
/// Construct values through [`Price::try_from`] so that negative, NaN and infinite amounts never make it into an
/// order. The inner value is stored as-is (`REAL` / `DOUBLE PRECISION`) and serialized as a plain JSON number.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Price(f64);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PriceError {
    #[error("Price cannot be negative: {0}")]
    Negative(f64),
    #[error("Price must be a finite number")]
    NotFinite,
}

impl TryFrom<f64> for Price {
    type Error = PriceError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            Err(PriceError::NotFinite)
        } else if value < 0.0 {
            Err(PriceError::Negative(value))
        } else {
            Ok(Self(value))
        }
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:0.2}", self.0)
    }
}

impl Price {
    pub fn value(&self) -> f64 {
        self.0
    }
}
