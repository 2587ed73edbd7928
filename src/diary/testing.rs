//! In-memory collaborators for controller tests.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use super::error::{DiaryError, DiaryResult};
use super::ports::{DayView, DiaryView, EntryEdit, EntryStore, FoodsCatalog, Preferences};
use crate::models::{
    DayWindow, DiaryEntry, Food, FoodDetails, FoodId, LoggedItem, Nutrient, NutrientKey,
    NutritionMap, Portion,
};

/// Food measured per "serving", so gram/ml portions count as one serving.
pub fn food(id: FoodId, name: &str, nutrients: &[(NutrientKey, f64)]) -> Food {
    let mut food = Food::new(name, Portion::new(1.0, "serving")).with_nutrients(
        nutrients
            .iter()
            .map(|(key, amount)| Nutrient::new(key.clone(), *amount))
            .collect(),
    );
    food.id = id;
    food
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<Vec<DiaryEntry>>,
}

impl MemoryStore {
    fn first_in(entries: &[DiaryEntry], from: DateTime<Utc>, to: DateTime<Utc>) -> Option<usize> {
        entries
            .iter()
            .enumerate()
            .filter(|(_, e)| from <= e.date_time && e.date_time < to)
            .min_by_key(|(_, e)| (e.date_time, e.id))
            .map(|(i, _)| i)
    }

    /// Entries are keyed by calendar day, whatever offset wrote them.
    fn on_day(entries: &[DiaryEntry], window: &DayWindow) -> Option<usize> {
        entries.iter().position(|e| e.date == window.date)
    }

    fn upsert(entries: &mut Vec<DiaryEntry>, entry: DiaryEntry) -> DiaryResult<()> {
        if entries.iter().any(|e| e.date == entry.date && e.id != entry.id) {
            return Err(DiaryError::DuplicateEntry(entry.date));
        }
        match entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
        Ok(())
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn get_by_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DiaryResult<Option<DiaryEntry>> {
        let entries = self.entries.lock().unwrap();
        Ok(Self::first_in(&entries, from, to).map(|i| entries[i].clone()))
    }

    async fn get_day(&self, window: &DayWindow) -> DiaryResult<Option<DiaryEntry>> {
        let entries = self.entries.lock().unwrap();
        Ok(Self::on_day(&entries, window).map(|i| entries[i].clone()))
    }

    async fn put(&self, entry: &DiaryEntry) -> DiaryResult<()> {
        let mut entries = self.entries.lock().unwrap();
        Self::upsert(&mut entries, entry.clone())
    }

    async fn update(
        &self,
        window: &DayWindow,
        edit: EntryEdit,
    ) -> DiaryResult<Option<DiaryEntry>> {
        let mut entries = self.entries.lock().unwrap();
        let current = Self::on_day(&entries, window).map(|i| entries[i].clone());
        let edited = edit(current)?;
        if let Some(entry) = &edited {
            Self::upsert(&mut entries, entry.clone())?;
        }
        Ok(edited)
    }
}

/// Store whose reads succeed and whose every write fails, like a database
/// that went away between the read and the write.
#[derive(Default)]
pub struct BrokenStore {
    entry: Option<DiaryEntry>,
}

impl BrokenStore {
    pub fn holding(entry: DiaryEntry) -> Self {
        Self { entry: Some(entry) }
    }
}

#[async_trait]
impl EntryStore for BrokenStore {
    async fn get_by_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DiaryResult<Option<DiaryEntry>> {
        Ok(self
            .entry
            .clone()
            .filter(|e| from <= e.date_time && e.date_time < to))
    }

    async fn put(&self, _entry: &DiaryEntry) -> DiaryResult<()> {
        Err(DiaryError::Store(sqlx::Error::PoolClosed))
    }
}

pub struct FakeCatalog {
    foods: HashMap<FoodId, Food>,
}

impl FakeCatalog {
    pub fn with_foods(foods: Vec<Food>) -> Self {
        Self {
            foods: foods.into_iter().map(|f| (f.id, f)).collect(),
        }
    }

    fn lookup(&self, id: FoodId) -> DiaryResult<&Food> {
        self.foods.get(&id).ok_or(DiaryError::UnknownFood(id))
    }
}

#[async_trait]
impl FoodsCatalog for FakeCatalog {
    async fn get_food(&self, id: FoodId) -> DiaryResult<FoodDetails> {
        Ok(self.lookup(id)?.details())
    }

    async fn get_nutrition(&self, item: &LoggedItem) -> DiaryResult<NutritionMap> {
        self.lookup(item.id)?
            .nutrition_for(&item.portion, item.quantity)
            .map_err(DiaryError::InvalidArgument)
    }
}

#[derive(Default)]
pub struct FakePreferences {
    weight: Mutex<Option<String>>,
}

#[async_trait]
impl Preferences for FakePreferences {
    async fn last_weight(&self) -> DiaryResult<Option<String>> {
        Ok(self.weight.lock().unwrap().clone())
    }

    async fn remember_weight(&self, value: &str) -> DiaryResult<()> {
        *self.weight.lock().unwrap() = Some(value.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    /// Date and number of grouped items
    ShowDay(NaiveDate, usize),
    /// Date and total calories
    NutritionCard(NaiveDate, f64),
    Confirm,
    /// Default value offered
    Prompt(String),
    Toast(String),
    Refresh,
}

/// Records what the controller asked of the view and answers dialogs with
/// canned replies.
pub struct FakeView {
    events: Mutex<Vec<ViewEvent>>,
    confirm: Mutex<bool>,
    prompt: Mutex<Option<String>>,
}

impl Default for FakeView {
    fn default() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            confirm: Mutex::new(true),
            prompt: Mutex::new(None),
        }
    }
}

impl FakeView {
    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn answer_confirm(&self, answer: bool) {
        *self.confirm.lock().unwrap() = answer;
    }

    pub fn answer_prompt(&self, answer: Option<&str>) {
        *self.prompt.lock().unwrap() = answer.map(str::to_string);
    }

    fn record(&self, event: ViewEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl DiaryView for FakeView {
    fn show_day(&self, day: &DayView) {
        self.record(ViewEvent::ShowDay(day.date, day.item_count()));
    }

    fn render_nutrition_card(&self, totals: &NutritionMap, date: NaiveDate) {
        self.record(ViewEvent::NutritionCard(
            date,
            totals.get(&NutrientKey::Calories),
        ));
    }

    fn confirm(&self, _title: &str, _text: &str) -> bool {
        self.record(ViewEvent::Confirm);
        *self.confirm.lock().unwrap()
    }

    fn prompt(&self, _title: &str, _text: &str, default: &str) -> Option<String> {
        self.record(ViewEvent::Prompt(default.to_string()));
        self.prompt.lock().unwrap().clone()
    }

    fn toast(&self, message: &str) {
        self.record(ViewEvent::Toast(message.to_string()));
    }

    fn refresh(&self) {
        self.record(ViewEvent::Refresh);
    }
}
