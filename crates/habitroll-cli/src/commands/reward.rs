use clap::Subcommand;
use habitroll_core::NewReward;

use super::{open_database, print_json, CliResult};

#[derive(Subcommand)]
pub enum RewardAction {
    /// Add a reward to the catalog
    Add {
        name: String,
        /// Base selection weight
        #[arg(long, default_value_t = 1.0)]
        weight: f64,
        /// Pieces needed before claiming (1 = instant)
        #[arg(long, default_value_t = 1)]
        pieces: u32,
        /// Monetary value of one piece
        #[arg(long)]
        value: Option<f64>,
        /// Max pieces per user per day (0 = unlimited)
        #[arg(long, default_value_t = 0)]
        daily_cap: u32,
        /// Add the "no reward" entry instead
        #[arg(long, conflicts_with_all = ["pieces", "daily_cap"])]
        nothing: bool,
    },
    /// List the catalog
    List {
        /// Include disabled rewards
        #[arg(long)]
        all: bool,
    },
    /// Remove a reward from the active catalog
    Disable { id: i64 },
    /// Return a reward to the active catalog
    Enable { id: i64 },
}

pub fn run(action: RewardAction) -> CliResult {
    let db = open_database()?;
    match action {
        RewardAction::Add {
            name,
            weight,
            pieces,
            value,
            daily_cap,
            nothing,
        } => {
            let mut reward = if nothing {
                NewReward {
                    name,
                    ..NewReward::nothing(weight)
                }
            } else {
                NewReward::new(name, weight)
                    .with_pieces(pieces)
                    .with_daily_cap(daily_cap)
            };
            reward.piece_value = value;
            print_json(&db.create_reward(&reward)?)?;
        }
        RewardAction::List { all } => {
            let rewards = if all {
                db.list_rewards()?
            } else {
                db.list_active_rewards()?
            };
            print_json(&rewards)?;
        }
        RewardAction::Disable { id } => {
            db.set_reward_active(id, false)?;
            println!("reward {id} disabled");
        }
        RewardAction::Enable { id } => {
            db.set_reward_active(id, true)?;
            println!("reward {id} enabled");
        }
    }
    Ok(())
}
