//! Target-exposure signals driving the backtester.

use chrono::NaiveDateTime;
use std::fmt;

use super::error::TradedeskError;

/// Desired market exposure for one timestep.
///
/// Only flat and fully-long are modelled. Short exposure (-1.0) and partial sizing are
/// not supported: values other than 0 and 1 are rejected by [`Exposure::from_value`]
/// instead of being approximated. A `Short` variant is where that support would go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Exposure {
    #[default]
    Flat,
    Long,
}

impl Exposure {
    pub fn from_value(value: f64, timestamp: NaiveDateTime) -> Result<Self, TradedeskError> {
        if value == 0.0 {
            Ok(Exposure::Flat)
        } else if value == 1.0 {
            Ok(Exposure::Long)
        } else {
            Err(TradedeskError::UnsupportedSignal {
                timestamp: timestamp.to_string(),
                value,
            })
        }
    }
}

impl fmt::Display for Exposure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exposure::Flat => write!(f, "flat"),
            Exposure::Long => write!(f, "long"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signal {
    pub timestamp: NaiveDateTime,
    pub exposure: Exposure,
}

impl Signal {
    pub fn new(timestamp: NaiveDateTime, exposure: Exposure) -> Self {
        Signal {
            timestamp,
            exposure,
        }
    }
}
