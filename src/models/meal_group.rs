use serde::Serialize;

use super::diary_entry::LoggedItem;
use super::food::FoodDetails;
use super::nutrient::NutritionMap;

/// A logged item with the catalog data needed to show it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedItem {
    #[serde(flatten)]
    pub item: LoggedItem,
    pub name: String,
    pub brand: Option<String>,
    pub recipe: bool,
    pub nutrition: NutritionMap,
    /// Position of `item` in the entry's `foods` when it was rendered
    pub index: usize,
}

impl EnrichedItem {
    pub fn new(item: LoggedItem, details: FoodDetails, nutrition: NutritionMap, index: usize) -> Self {
        Self {
            item,
            name: details.name,
            brand: details.brand,
            recipe: details.recipe,
            nutrition,
            index,
        }
    }
}

/// Items logged under one meal category for the selected day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealGroup {
    pub name: String,
    pub category_index: usize,
    pub items: Vec<EnrichedItem>,
    pub nutrition: NutritionMap,
}

impl MealGroup {
    pub fn new(name: impl Into<String>, category_index: usize) -> Self {
        Self {
            name: name.into(),
            category_index,
            items: Vec::new(),
            nutrition: NutritionMap::new(),
        }
    }

    pub fn add_item(&mut self, item: EnrichedItem) {
        self.nutrition.merge(&item.nutrition);
        self.items.push(item);
    }

    /// Drop items and totals, keeping name and category.
    pub fn reset(&mut self) {
        self.items.clear();
        self.nutrition.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
