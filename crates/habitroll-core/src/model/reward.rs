use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{validate_name, validate_weight};
use crate::error::ValidationError;

/// An entry in the reward catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    pub id: i64,
    pub name: String,
    /// Base selection weight, scaled by the completion's total weight.
    pub weight: f64,
    /// Pieces needed before the reward can be claimed. 1 means instant.
    pub pieces_required: u32,
    /// Optional monetary value of a single piece.
    pub piece_value: Option<f64>,
    /// Pieces this reward may award to one user per day. `None` is unlimited.
    pub max_daily_claims: Option<u32>,
    /// Drawing this entry grants nothing; it keeps the schedule unpredictable.
    pub is_nothing: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Reward {
    /// Daily cap, treating a stored zero as unlimited.
    pub fn daily_cap(&self) -> Option<u32> {
        self.max_daily_claims.filter(|cap| *cap > 0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReward {
    pub name: String,
    pub weight: f64,
    pub pieces_required: u32,
    pub piece_value: Option<f64>,
    pub max_daily_claims: Option<u32>,
    pub is_nothing: bool,
}

impl NewReward {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
            pieces_required: 1,
            piece_value: None,
            max_daily_claims: None,
            is_nothing: false,
        }
    }

    /// The "no reward" sentinel entry.
    pub fn nothing(weight: f64) -> Self {
        Self {
            is_nothing: true,
            ..Self::new("Nothing", weight)
        }
    }

    pub fn with_pieces(mut self, pieces_required: u32) -> Self {
        self.pieces_required = pieces_required;
        self
    }

    pub fn with_piece_value(mut self, value: f64) -> Self {
        self.piece_value = Some(value);
        self
    }

    pub fn with_daily_cap(mut self, cap: u32) -> Self {
        self.max_daily_claims = if cap == 0 { None } else { Some(cap) };
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("reward.name", &self.name)?;
        validate_weight("reward.weight", self.weight)?;
        if self.pieces_required < 1 {
            return Err(ValidationError::InvalidPiecesRequired(
                self.pieces_required as i64,
            ));
        }
        if let Some(value) = self.piece_value {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::InvalidValue {
                    field: "reward.piece_value".to_string(),
                    message: format!("{value} is not a non-negative amount"),
                });
            }
        }
        Ok(())
    }
}
