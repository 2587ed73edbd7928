//! Collaborators the diary controller talks to.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::error::DiaryResult;
use crate::models::{
    DayWindow, DiaryEntry, EnrichedItem, FoodDetails, FoodId, LoggedItem, MealGroup,
    NutritionMap, Stat,
};

/// Read-modify-write step applied to the entry of one day.
///
/// Receives the stored entry (if any) and returns the entry to persist, or
/// `None` to leave the store untouched.
pub type EntryEdit =
    Box<dyn FnOnce(Option<DiaryEntry>) -> DiaryResult<Option<DiaryEntry>> + Send>;

/// Date-indexed storage of diary entries.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Entry whose `date_time` lies in `[from, to)`. If several match, the
    /// first in `(date_time, id)` order is returned.
    async fn get_by_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DiaryResult<Option<DiaryEntry>>;

    /// Entry of the calendar day `window` covers. Stores that index entries
    /// by day should match on `window.date`, so an entry written under a
    /// different UTC offset is still found.
    async fn get_day(&self, window: &DayWindow) -> DiaryResult<Option<DiaryEntry>> {
        self.get_by_date_range(window.from, window.to).await
    }

    /// Insert or fully replace an entry.
    async fn put(&self, entry: &DiaryEntry) -> DiaryResult<()>;

    /// Load the entry of `window`, apply `edit` and persist the result.
    /// Returns what was written.
    ///
    /// The default is a plain read then write; stores with transactions
    /// override it to make the pair atomic.
    async fn update(
        &self,
        window: &DayWindow,
        edit: EntryEdit,
    ) -> DiaryResult<Option<DiaryEntry>> {
        let current = self.get_day(window).await?;
        let edited = edit(current)?;
        if let Some(entry) = &edited {
            self.put(entry).await?;
        }
        Ok(edited)
    }
}

/// Food and recipe lookups.
#[async_trait]
pub trait FoodsCatalog: Send + Sync {
    async fn get_food(&self, id: FoodId) -> DiaryResult<FoodDetails>;

    /// Nutrition of one logged item (portion and quantity applied).
    async fn get_nutrition(&self, item: &LoggedItem) -> DiaryResult<NutritionMap>;

    /// Day-level total over enriched items.
    async fn get_total_nutrition(&self, items: &[EnrichedItem]) -> DiaryResult<NutritionMap> {
        Ok(items.iter().map(|item| &item.nutrition).sum())
    }
}

/// Values remembered across days.
#[async_trait]
pub trait Preferences: Send + Sync {
    async fn last_weight(&self) -> DiaryResult<Option<String>>;
    async fn remember_weight(&self, value: &str) -> DiaryResult<()>;
}

/// Everything shown for the selected day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayView {
    pub date: NaiveDate,
    pub groups: Vec<MealGroup>,
    pub totals: NutritionMap,
    pub weight: Option<Stat>,
}

impl DayView {
    pub fn item_count(&self) -> usize {
        self.groups.iter().map(|g| g.items.len()).sum()
    }
}

/// Presentation and dialogs.
pub trait DiaryView {
    /// Replace whatever is currently shown with `day`.
    fn show_day(&self, day: &DayView);
    fn render_nutrition_card(&self, totals: &NutritionMap, date: NaiveDate);
    fn confirm(&self, title: &str, text: &str) -> bool;
    /// `None` when the user cancels.
    fn prompt(&self, title: &str, text: &str, default: &str) -> Option<String>;
    fn toast(&self, message: &str);
    fn refresh(&self);
}
