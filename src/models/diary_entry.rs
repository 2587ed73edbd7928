use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use super::day_window::DayWindow;

/// Catalog reference for a food or recipe.
pub type FoodId = i64;

pub const WEIGHT_STAT: &str = "weight";
pub const WEIGHT_UNIT: &str = "kg";

/// Quantity used when a caller leaves it unset (or zero).
fn quantity_or_default(quantity: Option<f64>) -> f64 {
    match quantity {
        Some(q) if q != 0.0 && q.is_finite() => q,
        _ => 1.0,
    }
}

/// A quantity, when given, must be a finite number that is not negative.
pub fn quantity_is_valid(quantity: Option<f64>) -> bool {
    quantity.map_or(true, |q| q.is_finite() && q >= 0.0)
}

/// One food logged against a day. Owned by its `DiaryEntry`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedItem {
    /// Stable handle, survives reordering of `foods`
    #[serde(default = "Uuid::new_v4")]
    pub uid: Uuid,
    pub id: FoodId,
    pub portion: String,
    pub quantity: f64,
    pub category: usize,
}

impl LoggedItem {
    pub fn new(
        id: FoodId,
        portion: impl Into<String>,
        quantity: Option<f64>,
        category: usize,
    ) -> Self {
        Self {
            uid: Uuid::new_v4(),
            id,
            portion: portion.into(),
            quantity: quantity_or_default(quantity),
            category,
        }
    }

    pub fn from_draft(draft: &ItemDraft, category: usize) -> Self {
        Self::new(draft.id, draft.portion.clone(), draft.quantity, category)
    }
}

/// Food picked for logging, before it has a category or a place in a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub id: FoodId,
    pub portion: String,
    #[serde(default)]
    pub quantity: Option<f64>,
}

impl ItemDraft {
    pub fn new(id: FoodId, portion: impl Into<String>) -> Self {
        Self {
            id,
            portion: portion.into(),
            quantity: None,
        }
    }

    pub fn with_quantity(mut self, quantity: f64) -> Self {
        self.quantity = Some(quantity);
        self
    }
}

/// Replacement for the item at `index` of a day's `foods`.
///
/// When `uid` is set the replacement is refused if the item currently at
/// `index` is a different one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemUpdate {
    pub id: FoodId,
    pub category: usize,
    pub portion: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    pub index: usize,
    #[serde(default)]
    pub uid: Option<Uuid>,
}

impl ItemUpdate {
    pub fn new(id: FoodId, category: usize, portion: impl Into<String>, index: usize) -> Self {
        Self {
            id,
            category,
            portion: portion.into(),
            quantity: None,
            index,
            uid: None,
        }
    }

    pub fn with_quantity(mut self, quantity: f64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn expecting(mut self, uid: Uuid) -> Self {
        self.uid = Some(uid);
        self
    }

    /// The replacement item, keeping the uid of the item it replaces.
    pub fn into_item(self, uid: Uuid) -> LoggedItem {
        LoggedItem {
            uid,
            id: self.id,
            portion: self.portion,
            quantity: quantity_or_default(self.quantity),
            category: self.category,
        }
    }
}

/// A named daily statistic, e.g. body weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    pub value: String,
    pub unit: String,
}

impl Stat {
    pub fn new(value: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            unit: unit.into(),
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

/// Everything logged for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub id: Uuid,
    pub date: NaiveDate,
    /// Local midnight of `date`, in UTC
    pub date_time: DateTime<Utc>,
    pub foods: Vec<LoggedItem>,
    pub stats: BTreeMap<String, Stat>,
}

impl DiaryEntry {
    pub fn new(window: &DayWindow) -> Self {
        Self {
            id: Uuid::new_v4(),
            date: window.date,
            date_time: window.from,
            foods: Vec::new(),
            stats: BTreeMap::new(),
        }
    }

    #[cfg(test)]
    pub fn with_foods(mut self, foods: Vec<LoggedItem>) -> Self {
        self.foods = foods;
        self
    }

    pub fn weight(&self) -> Option<&Stat> {
        self.stats.get(WEIGHT_STAT)
    }

    pub fn set_weight(&mut self, value: impl Into<String>) {
        self.stats
            .insert(WEIGHT_STAT.to_string(), Stat::new(value, WEIGHT_UNIT));
    }
}

impl fmt::Display for DiaryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Diary: {}", self.date)?;
        writeln!(f, "{}", "=".repeat(18))?;
        for (i, item) in self.foods.iter().enumerate() {
            writeln!(
                f,
                "  [{}] food {} x{} ({}) meal {}",
                i, item.id, item.quantity, item.portion, item.category
            )?;
        }
        for (name, stat) in &self.stats {
            writeln!(f, "  {}: {}", name, stat)?;
        }
        Ok(())
    }
}
