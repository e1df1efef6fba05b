use clap::Subcommand;
use habitroll_core::NewUser;

use super::{open_database, print_json, CliResult};

#[derive(Subcommand)]
pub enum UserAction {
    /// Register a user
    Add {
        name: String,
        /// Personal weight multiplier
        #[arg(long, default_value_t = 1.0)]
        weight: f64,
    },
    /// List users
    List,
    /// Change a user's weight multiplier
    Weight { id: i64, weight: f64 },
    /// Disable a user
    Disable { id: i64 },
    /// Re-enable a user
    Enable { id: i64 },
}

pub fn run(action: UserAction) -> CliResult {
    let db = open_database()?;
    match action {
        UserAction::Add { name, weight } => {
            let user = db.create_user(&NewUser::new(name).with_weight(weight))?;
            print_json(&user)?;
        }
        UserAction::List => print_json(&db.list_users()?)?,
        UserAction::Weight { id, weight } => {
            db.set_user_weight(id, weight)?;
            print_json(&db.get_user(id)?)?;
        }
        UserAction::Disable { id } => {
            db.set_user_active(id, false)?;
            println!("user {id} disabled");
        }
        UserAction::Enable { id } => {
            db.set_user_active(id, true)?;
            println!("user {id} enabled");
        }
    }
    Ok(())
}
