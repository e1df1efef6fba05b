use clap::Subcommand;
use habitroll_core::NewHabit;

use super::{open_database, print_json, CliResult};

#[derive(Subcommand)]
pub enum HabitAction {
    /// Create a habit
    Add {
        name: String,
        #[arg(long, default_value_t = 1.0)]
        weight: f64,
        #[arg(long, default_value = "general")]
        category: String,
    },
    /// List habits
    List {
        /// Include disabled habits
        #[arg(long)]
        all: bool,
    },
    /// Change name, weight or category
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        weight: Option<f64>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Disable a habit
    Disable { id: i64 },
    /// Re-enable a habit
    Enable { id: i64 },
}

pub fn run(action: HabitAction) -> CliResult {
    let db = open_database()?;
    match action {
        HabitAction::Add {
            name,
            weight,
            category,
        } => {
            let habit = db.create_habit(
                &NewHabit::new(name)
                    .with_weight(weight)
                    .with_category(category),
            )?;
            print_json(&habit)?;
        }
        HabitAction::List { all } => print_json(&db.list_habits(all)?)?,
        HabitAction::Update {
            id,
            name,
            weight,
            category,
        } => {
            let current = db
                .get_habit(id)?
                .ok_or_else(|| format!("habit {id} not found"))?;
            let update = NewHabit {
                name: name.unwrap_or(current.name),
                weight: weight.unwrap_or(current.weight),
                category: category.unwrap_or(current.category),
            };
            print_json(&db.update_habit(id, &update)?)?;
        }
        HabitAction::Disable { id } => {
            db.set_habit_active(id, false)?;
            println!("habit {id} disabled");
        }
        HabitAction::Enable { id } => {
            db.set_habit_active(id, true)?;
            println!("habit {id} enabled");
        }
    }
    Ok(())
}
