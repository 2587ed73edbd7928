use clap::{Args, Subcommand};

use super::OutputFormat;
use crate::db::FoodRepository;
use crate::models::{Food, Nutrient, NutrientKey, Portion};

#[derive(Args)]
pub struct FoodCommand {
    #[command(subcommand)]
    pub command: FoodSubcommand,
}

#[derive(Subcommand)]
pub enum FoodSubcommand {
    /// Add a food or recipe to the catalog
    Add {
        /// Name of the food
        #[arg(long)]
        name: String,

        /// Brand
        #[arg(long)]
        brand: Option<String>,

        /// Mark as a recipe
        #[arg(long)]
        recipe: bool,

        /// Reference portion the nutrients are given for, e.g. 100g
        #[arg(long, default_value = "100g")]
        portion: String,

        /// Nutrient amount per portion as KEY=AMOUNT (can be repeated)
        #[arg(long = "nutrient", value_name = "KEY=AMOUNT")]
        nutrients: Vec<String>,
    },

    /// List all foods
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a food's details
    Show {
        /// Food ID or name
        identifier: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

/// Parse `calories=52` into a nutrient.
fn parse_nutrient(input: &str) -> Result<Nutrient, String> {
    let (key, amount) = input
        .split_once('=')
        .ok_or_else(|| format!("Invalid nutrient '{}', expected KEY=AMOUNT", input))?;

    if key.trim().is_empty() {
        return Err(format!("Missing nutrient name in '{}'", input));
    }
    let amount: f64 = amount
        .trim()
        .parse()
        .map_err(|_| format!("Invalid amount in '{}'", input))?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(format!("Nutrient amount must not be negative in '{}'", input));
    }

    Ok(Nutrient::new(NutrientKey::from_name(key), amount))
}

impl FoodCommand {
    pub async fn run(&self, repo: &FoodRepository) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            FoodSubcommand::Add {
                name,
                brand,
                recipe,
                portion,
                nutrients,
            } => {
                if name.trim().is_empty() {
                    return Err("Food name cannot be empty".into());
                }

                let portion: Portion = portion.parse()?;
                let nutrients = nutrients
                    .iter()
                    .map(|n| parse_nutrient(n))
                    .collect::<Result<Vec<_>, _>>()?;
                for nutrient in nutrients.iter().filter(|n| n.key.is_custom()) {
                    tracing::info!("Storing custom nutrient '{}'", nutrient.key);
                }

                let mut food = Food::new(name.trim(), portion).with_nutrients(nutrients);
                if let Some(brand) = brand {
                    food = food.with_brand(brand.trim());
                }
                if *recipe {
                    food = food.as_recipe();
                }

                let created = repo.create(&food).await?;
                tracing::info!("Created food {} ({})", created.id, created.name);
                println!("Created food:");
                println!("{}", created);
                Ok(())
            }

            FoodSubcommand::List { format } => {
                let foods = repo.list().await?;

                if foods.is_empty() {
                    println!("No foods found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&foods)?);
                    }
                    OutputFormat::Text => {
                        println!("{:>6}  {:<30}  {:<10}  KCAL", "ID", "NAME", "PORTION");
                        println!("{}", "-".repeat(60));
                        for food in &foods {
                            let name = if food.name.chars().count() > 30 {
                                format!("{}...", food.name.chars().take(27).collect::<String>())
                            } else {
                                food.name.clone()
                            };
                            println!(
                                "{:>6}  {:<30}  {:<10}  {}",
                                food.id,
                                name,
                                food.portion.to_string(),
                                food.nutrition().get(&NutrientKey::Calories)
                            );
                        }
                        println!("\nTotal: {} food(s)", foods.len());
                    }
                }
                Ok(())
            }

            FoodSubcommand::Show { identifier, format } => {
                // Try to parse as an ID first, then fall back to name lookup
                let food = match identifier.parse::<i64>() {
                    Ok(id) => repo.get_by_id(id).await?,
                    Err(_) => repo.get_by_name(identifier).await?,
                };

                match food {
                    Some(food) => {
                        match format {
                            OutputFormat::Json => {
                                println!("{}", serde_json::to_string_pretty(&food)?);
                            }
                            OutputFormat::Text => {
                                println!("{}", food);
                            }
                        }
                        Ok(())
                    }
                    None => Err(format!("Food not found: {}", identifier).into()),
                }
            }
        }
    }
}
