use crate::model::{Habit, User};

/// Combines habit weight, user weight and streak into one multiplier.
///
/// `habit.weight * user.weight * (1 + streak * streak_rate)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightResolver {
    streak_rate: f64,
}

impl WeightResolver {
    pub fn new(streak_rate: f64) -> Self {
        Self { streak_rate }
    }

    pub fn total_weight(&self, habit: &Habit, user: &User, streak: u32) -> f64 {
        self.resolve(habit.weight, user.weight, streak)
    }

    pub fn resolve(&self, habit_weight: f64, user_weight: f64, streak: u32) -> f64 {
        habit_weight * user_weight * (1.0 + f64::from(streak) * self.streak_rate)
    }
}
