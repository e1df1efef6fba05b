use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{validate_name, validate_weight};
use crate::error::ValidationError;

/// A participant whose completions earn rewards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    /// Personal multiplier applied to every completion.
    pub weight: f64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A tracked habit.
///
/// Read once per completion and treated as immutable for that transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: i64,
    pub name: String,
    pub weight: f64,
    pub category: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub weight: f64,
}

impl NewUser {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weight: 1.0,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("user.name", &self.name)?;
        validate_weight("user.weight", self.weight)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHabit {
    pub name: String,
    pub weight: f64,
    pub category: String,
}

impl NewHabit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weight: 1.0,
            category: "general".to_string(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("habit.name", &self.name)?;
        validate_weight("habit.weight", self.weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_default_to_unit_weight() {
        assert_eq!(NewUser::new("ana").weight, 1.0);
        let habit = NewHabit::new("Read").with_category("mind");
        assert_eq!(habit.weight, 1.0);
        assert_eq!(habit.category, "mind");
    }

    #[test]
    fn rejects_bad_weights_and_names() {
        assert!(NewUser::new("ana").with_weight(0.0).validate().is_err());
        assert!(NewUser::new("ana").with_weight(f64::NAN).validate().is_err());
        assert!(NewHabit::new("  ").validate().is_err());
        assert!(NewHabit::new("Run").with_weight(-2.0).validate().is_err());
        assert!(NewHabit::new("Run").with_weight(1.5).validate().is_ok());
    }
}
