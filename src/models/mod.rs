mod day_window;
mod diary_entry;
mod food;
mod meal_group;
mod nutrient;

pub use day_window::{DayWindow, DayZone};
pub use diary_entry::{
    quantity_is_valid, DiaryEntry, FoodId, ItemDraft, ItemUpdate, LoggedItem, Stat,
};
pub use food::{Food, FoodDetails, Portion};
pub use meal_group::{EnrichedItem, MealGroup};
pub use nutrient::{Nutrient, NutrientKey, NutritionMap};
