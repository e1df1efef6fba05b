use chrono::{DateTime, Utc};

use super::{open_engine, print_json, CliResult};

fn parse_time(at: Option<&str>) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    match at {
        Some(raw) => Ok(DateTime::parse_from_rfc3339(raw)
            .map_err(|e| format!("invalid --at '{raw}': {e}"))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

pub fn complete(user: i64, habit: i64, at: Option<&str>) -> CliResult {
    let completed_at = parse_time(at)?;
    let mut engine = open_engine()?;
    print_json(&engine.complete(user, habit, completed_at)?)
}

pub fn streaks(user: i64) -> CliResult {
    print_json(&open_engine()?.current_streaks(user)?)
}

pub fn claim(user: i64, reward: i64) -> CliResult {
    print_json(&open_engine()?.claim(user, reward)?)
}

pub fn progress(user: i64) -> CliResult {
    print_json(&open_engine()?.progress_for_user(user)?)
}

pub fn history(user: i64, limit: u32) -> CliResult {
    print_json(&open_engine()?.history(user, limit)?)
}

pub fn revert(completion: i64) -> CliResult {
    print_json(&open_engine()?.revert_completion(completion)?)
}
