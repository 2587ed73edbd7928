use chrono::{Days, NaiveDate};
use clap::{Args, Subcommand};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{OutputFormat, TerminalView};
use crate::config::Config;
use crate::db::{DiaryRepository, FoodRepository, PreferenceRepository};
use crate::diary::{
    DiaryController, DiaryView, EntryStore, FoodsCatalog, InitContext, Preferences,
};
use crate::models::{DayZone, FoodId, ItemDraft, ItemUpdate};

type Controller =
    DiaryController<DiaryRepository, FoodRepository, TerminalView, PreferenceRepository>;

#[derive(Args)]
pub struct DiaryCommand {
    #[command(subcommand)]
    pub command: DiarySubcommand,
}

#[derive(Subcommand)]
pub enum DiarySubcommand {
    /// Show a day grouped by meal, with nutrition totals
    Show {
        /// Day to show (YYYY-MM-DD, today, yesterday or tomorrow)
        #[arg(long, short)]
        date: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Log one or more foods under a meal
    Add {
        /// Meal name or category index
        #[arg(long, short)]
        meal: String,

        /// Food ID (can be repeated)
        #[arg(long = "food", value_name = "ID", required = true)]
        foods: Vec<FoodId>,

        /// Portion for the food at the same position, e.g. 150g
        #[arg(long = "portion", value_name = "PORTION")]
        portions: Vec<String>,

        /// Quantity for the food at the same position
        #[arg(long = "quantity", value_name = "QUANTITY")]
        quantities: Vec<f64>,

        /// Day to log to
        #[arg(long, short)]
        date: Option<String>,
    },

    /// Replace a logged item
    Update {
        /// Item index, as shown by `diary show`
        #[arg(long, short)]
        index: usize,

        /// Food ID
        #[arg(long)]
        food: FoodId,

        /// Meal name or category index
        #[arg(long, short)]
        meal: String,

        /// Portion, e.g. 150g (defaults to the food's own portion)
        #[arg(long)]
        portion: Option<String>,

        /// Quantity
        #[arg(long)]
        quantity: Option<f64>,

        /// Refuse the update unless the item at INDEX has this uid
        #[arg(long, value_name = "UID")]
        expect: Option<Uuid>,

        /// Day of the item
        #[arg(long, short)]
        date: Option<String>,
    },

    /// Remove a logged item
    Delete {
        /// Item index, as shown by `diary show`
        #[arg(long, short)]
        index: usize,

        /// Skip confirmation prompt
        #[arg(long, short)]
        yes: bool,

        /// Refuse the deletion unless the item at INDEX has this uid
        #[arg(long, value_name = "UID")]
        expect: Option<Uuid>,

        /// Day of the item
        #[arg(long, short)]
        date: Option<String>,
    },

    /// Record body weight in kg; asks for it when VALUE is omitted
    Weight {
        value: Option<String>,

        /// Day to record on
        #[arg(long, short)]
        date: Option<String>,
    },

    /// List recorded days in a date range
    History {
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        from: String,

        /// Last day, inclusive (defaults to today)
        #[arg(long)]
        to: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

/// Parse a day argument; relative names are resolved against `today`.
fn parse_date(input: &str, today: NaiveDate) -> Result<NaiveDate, String> {
    match input.trim().to_lowercase().as_str() {
        "today" => Ok(today),
        "yesterday" => today
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| format!("No day before {}", today)),
        "tomorrow" => today
            .checked_add_days(Days::new(1))
            .ok_or_else(|| format!("No day after {}", today)),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
            .map_err(|_| format!("Invalid date '{}', expected YYYY-MM-DD", input)),
    }
}

/// Resolve a meal given by name (case-insensitive) or category index.
/// Hidden meals (empty names) cannot be chosen.
fn resolve_meal(meal_names: &[String], meal: &str) -> Result<usize, String> {
    let visible = |i: usize| meal_names.get(i).is_some_and(|n| !n.trim().is_empty());

    if let Ok(index) = meal.trim().parse::<usize>() {
        if visible(index) {
            return Ok(index);
        }
    }

    if let Some(index) = meal_names
        .iter()
        .position(|n| !n.trim().is_empty() && n.trim().eq_ignore_ascii_case(meal.trim()))
    {
        return Ok(index);
    }

    let choices: Vec<&str> = meal_names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .collect();
    Err(format!(
        "Unknown meal '{}'. Choose one of: {}",
        meal,
        choices.join(", ")
    ))
}

/// Pair foods with portions and quantities by position. Missing portions
/// fall back to `default_portion`.
fn build_drafts(
    foods: &[FoodId],
    portions: &[String],
    quantities: &[f64],
    default_portion: impl Fn(FoodId) -> String,
) -> Result<Vec<ItemDraft>, String> {
    if portions.len() > foods.len() || quantities.len() > foods.len() {
        return Err("More --portion/--quantity values than --food values".to_string());
    }

    Ok(foods
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let portion = portions
                .get(i)
                .cloned()
                .unwrap_or_else(|| default_portion(*id));
            let draft = ItemDraft::new(*id, portion);
            match quantities.get(i) {
                Some(quantity) => draft.with_quantity(*quantity),
                None => draft,
            }
        })
        .collect())
}

/// Move the controller to the day named by `date` (today when absent).
async fn select_day<S, C, V, P>(
    controller: &mut DiaryController<S, C, V, P>,
    date: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>>
where
    S: EntryStore,
    C: FoodsCatalog,
    V: DiaryView,
    P: Preferences,
{
    match date.map(|d| d.trim().to_lowercase()) {
        None => controller.reset_date().await?,
        Some(d) if d == "today" => controller.reset_date().await?,
        Some(d) if d == "yesterday" => {
            controller.reset_date().await?;
            controller.previous_day().await?;
        }
        Some(d) if d == "tomorrow" => {
            controller.reset_date().await?;
            controller.next_day().await?;
        }
        Some(d) => {
            let date = parse_date(&d, controller.selected_date())?;
            controller.select_date(date).await?;
        }
    }
    Ok(())
}

impl DiaryCommand {
    pub async fn run(
        &self,
        pool: SqlitePool,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let foods = FoodRepository::new(pool.clone());
        let preferences = PreferenceRepository::new(pool.clone());
        let settings = config.diary_settings(preferences.last_weight().await?);

        let view = match &self.command {
            DiarySubcommand::Show { format, .. } => TerminalView::new(format.clone()),
            DiarySubcommand::Delete { yes, .. } => {
                TerminalView::new(OutputFormat::Text).assume_yes(*yes)
            }
            _ => TerminalView::new(OutputFormat::Text),
        };

        let mut controller: Controller = DiaryController::new(
            DiaryRepository::new(pool.clone()),
            FoodRepository::new(pool.clone()),
            view,
            preferences,
            settings,
        );

        match &self.command {
            DiarySubcommand::Show { date, .. } => {
                select_day(&mut controller, date.as_deref()).await?;
                controller.initialize(None).await?;
                Ok(())
            }

            DiarySubcommand::Add {
                meal,
                foods: food_ids,
                portions,
                quantities,
                date,
            } => {
                let category = resolve_meal(&controller.settings().meal_names, meal)?;

                // Default portions come from the catalog, which also rejects unknown IDs
                let mut known = Vec::with_capacity(food_ids.len());
                for id in food_ids {
                    match foods.get_by_id(*id).await? {
                        Some(food) => known.push(food),
                        None => return Err(format!("Food not found: {}", id).into()),
                    }
                }
                let items = build_drafts(food_ids, portions, quantities, |id| {
                    known
                        .iter()
                        .find(|f| f.id == id)
                        .map(|f| f.portion.to_string())
                        .unwrap_or_default()
                })?;

                select_day(&mut controller, date.as_deref()).await?;
                controller
                    .initialize(Some(InitContext::Items { items, category }))
                    .await?;
                Ok(())
            }

            DiarySubcommand::Update {
                index,
                food,
                meal,
                portion,
                quantity,
                expect,
                date,
            } => {
                let category = resolve_meal(&controller.settings().meal_names, meal)?;
                let portion = match portion {
                    Some(portion) => portion.clone(),
                    None => match foods.get_by_id(*food).await? {
                        Some(found) => found.portion.to_string(),
                        None => return Err(format!("Food not found: {}", food).into()),
                    },
                };

                let mut update = ItemUpdate::new(*food, category, portion, *index);
                if let Some(quantity) = quantity {
                    update = update.with_quantity(*quantity);
                }
                if let Some(uid) = expect {
                    update = update.expecting(*uid);
                }

                select_day(&mut controller, date.as_deref()).await?;
                controller.initialize(Some(InitContext::Item(update))).await?;
                Ok(())
            }

            DiarySubcommand::Delete {
                index,
                expect,
                date,
                ..
            } => {
                select_day(&mut controller, date.as_deref()).await?;
                if !controller.delete_item(*index, *expect).await? {
                    println!("Nothing deleted.");
                }
                Ok(())
            }

            DiarySubcommand::Weight { value, date } => {
                select_day(&mut controller, date.as_deref()).await?;
                match value {
                    Some(value) => controller.set_weight(value).await?,
                    None => {
                        if !controller.log_weight().await? {
                            println!("Cancelled.");
                        }
                    }
                }
                Ok(())
            }

            DiarySubcommand::History { from, to, format } => {
                let today = DayZone::Local.today();
                let from = parse_date(from, today)?;
                let to = match to {
                    Some(to) => parse_date(to, today)?,
                    None => today,
                };
                if to < from {
                    return Err("--to must not be before --from".into());
                }

                let entries = DiaryRepository::new(pool).list_days(from, to).await?;

                if entries.is_empty() {
                    println!("No diary entries found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&entries)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<12}  {:>5}  WEIGHT", "DATE", "ITEMS");
                        println!("{}", "-".repeat(32));
                        for entry in &entries {
                            let weight = entry
                                .weight()
                                .map(|w| w.to_string())
                                .unwrap_or_else(|| "-".to_string());
                            println!(
                                "{:<12}  {:>5}  {}",
                                entry.date.to_string(),
                                entry.foods.len(),
                                weight
                            );
                        }
                        println!("\nTotal: {} day(s)", entries.len());
                    }
                }
                Ok(())
            }
        }
    }
}
