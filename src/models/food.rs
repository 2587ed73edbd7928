use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::diary_entry::FoodId;
use super::nutrient::{Nutrient, NutritionMap};

/// An amount of some unit, e.g. `100g` or `1 cup`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portion {
    pub amount: f64,
    pub unit: String,
}

impl Portion {
    pub fn new(amount: f64, unit: impl Into<String>) -> Self {
        Self {
            amount,
            unit: unit.into(),
        }
    }

    fn same_unit(&self, other: &Portion) -> bool {
        self.unit.eq_ignore_ascii_case(&other.unit)
    }
}

impl FromStr for Portion {
    type Err = String;

    /// A leading number is the amount (1 when absent), the rest is the unit.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(s.len());
        let (number, unit) = s.split_at(split);

        let amount = if number.is_empty() {
            1.0
        } else {
            number
                .parse::<f64>()
                .map_err(|_| format!("Invalid portion amount '{}'", number))?
        };

        if amount <= 0.0 {
            return Err(format!("Portion amount must be positive: '{}'", s));
        }

        Ok(Portion::new(amount, unit.trim()))
    }
}

impl fmt::Display for Portion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit.chars().count() <= 2 {
            write!(f, "{}{}", self.amount, self.unit)
        } else {
            write!(f, "{} {}", self.amount, self.unit)
        }
    }
}

/// Display fields the diary needs for a logged food.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodDetails {
    pub name: String,
    pub brand: Option<String>,
    pub recipe: bool,
}

/// A catalog food or recipe with its nutrition per `portion`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub id: FoodId,
    pub name: String,
    pub brand: Option<String>,
    pub recipe: bool,
    pub portion: Portion,
    pub nutrients: Vec<Nutrient>,
}

impl Food {
    /// New food; `id` is assigned by the catalog on insert.
    pub fn new(name: impl Into<String>, portion: Portion) -> Self {
        Self {
            id: 0,
            name: name.into(),
            brand: None,
            recipe: false,
            portion,
            nutrients: Vec::new(),
        }
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn as_recipe(mut self) -> Self {
        self.recipe = true;
        self
    }

    pub fn with_nutrients(mut self, nutrients: Vec<Nutrient>) -> Self {
        self.nutrients = nutrients;
        self
    }

    pub fn details(&self) -> FoodDetails {
        FoodDetails {
            name: self.name.clone(),
            brand: self.brand.clone(),
            recipe: self.recipe,
        }
    }

    pub fn nutrition(&self) -> NutritionMap {
        self.nutrients
            .iter()
            .map(|n| (n.key.clone(), n.amount))
            .collect()
    }

    /// Nutrition for `quantity` x `portion` of this food.
    ///
    /// A portion in the food's own unit scales by amount; any other unit (or
    /// an empty portion) counts as one of the food's reference portions.
    pub fn nutrition_for(&self, portion: &str, quantity: f64) -> Result<NutritionMap, String> {
        let factor = if portion.trim().is_empty() {
            1.0
        } else {
            let requested: Portion = portion.parse()?;
            if requested.same_unit(&self.portion) && self.portion.amount > 0.0 {
                requested.amount / self.portion.amount
            } else {
                tracing::debug!(
                    "Portion '{}' does not match '{}' for {}, using reference portion",
                    portion,
                    self.portion,
                    self.name
                );
                1.0
            }
        };

        Ok(self.nutrition().scaled(factor * quantity))
    }
}

impl fmt::Display for Food {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = match &self.brand {
            Some(brand) => format!("{} ({})", self.name, brand),
            None => self.name.clone(),
        };
        writeln!(f, "{}", title)?;
        writeln!(f, "{}", "=".repeat(title.len()))?;
        writeln!(f, "ID: {}", self.id)?;
        if self.recipe {
            writeln!(f, "Recipe: yes")?;
        }
        writeln!(f, "Per {}:", self.portion)?;
        for nutrient in &self.nutrients {
            writeln!(f, "  - {}", nutrient)?;
        }
        Ok(())
    }
}
