use chrono::{Days, NaiveDate};
use serde::Serialize;
use uuid::Uuid;

use super::error::{DiaryError, DiaryResult};
use super::ports::{DayView, DiaryView, EntryStore, FoodsCatalog, Preferences};
use crate::models::{
    quantity_is_valid, DayWindow, DayZone, DiaryEntry, EnrichedItem, ItemDraft, ItemUpdate,
    LoggedItem, MealGroup, NutritionMap,
};

/// Settings the diary reads, passed in at construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiarySettings {
    /// Ordered meal names; the position is the category index
    pub meal_names: Vec<String>,
    /// Weight offered when recording a new one
    pub default_weight: String,
}

impl Default for DiarySettings {
    fn default() -> Self {
        Self {
            meal_names: ["Breakfast", "Lunch", "Dinner", "Snacks"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            default_weight: "70".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    /// Groups must be rebuilt from settings before the next render
    Uninitialized,
    Ready,
}

/// Work to do before the first render of `initialize`.
#[derive(Debug, Clone, PartialEq)]
pub enum InitContext {
    Items {
        items: Vec<ItemDraft>,
        category: usize,
    },
    Item(ItemUpdate),
}

/// Owns the selected day and mediates every read and write of its entry.
pub struct DiaryController<S, C, V, P> {
    store: S,
    catalog: C,
    view: V,
    preferences: P,
    settings: DiarySettings,
    zone: DayZone,
    date: NaiveDate,
    groups: Vec<MealGroup>,
    state: RenderState,
}

impl<S, C, V, P> DiaryController<S, C, V, P>
where
    S: EntryStore,
    C: FoodsCatalog,
    V: DiaryView,
    P: Preferences,
{
    /// Controller for today in the local timezone.
    pub fn new(store: S, catalog: C, view: V, preferences: P, settings: DiarySettings) -> Self {
        let zone = DayZone::Local;
        Self {
            store,
            catalog,
            view,
            preferences,
            settings,
            zone,
            date: zone.today(),
            groups: Vec::new(),
            state: RenderState::Uninitialized,
        }
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.date
    }

    pub fn day_window(&self) -> DiaryResult<DayWindow> {
        DayWindow::for_date(self.date, self.zone).ok_or_else(|| {
            DiaryError::InvalidArgument(format!("Date {} is out of range", self.date))
        })
    }

    pub fn settings(&self) -> &DiarySettings {
        &self.settings
    }

    /// Apply `context` (if any), then render. A context always forces a
    /// full rebuild of the groups.
    pub async fn initialize(&mut self, context: Option<InitContext>) -> DiaryResult<()> {
        if let Some(context) = context {
            match context {
                InitContext::Items { items, category } => {
                    self.add_items(&items, category).await?;
                }
                InitContext::Item(update) => {
                    self.update_item(&update).await?;
                }
            }
            self.state = RenderState::Uninitialized;
        }

        if self.state == RenderState::Uninitialized {
            self.render().await?;
        }

        Ok(())
    }

    /// Change the selected day, re-rendering in place when already shown.
    pub async fn select_date(&mut self, date: NaiveDate) -> DiaryResult<()> {
        self.date = date;
        if self.state == RenderState::Ready {
            self.render().await?;
        }
        Ok(())
    }

    pub async fn previous_day(&mut self) -> DiaryResult<()> {
        let date = self.date.checked_sub_days(Days::new(1)).ok_or_else(|| {
            DiaryError::InvalidArgument(format!("No day before {}", self.date))
        })?;
        self.select_date(date).await
    }

    pub async fn next_day(&mut self) -> DiaryResult<()> {
        let date = self.date.checked_add_days(Days::new(1)).ok_or_else(|| {
            DiaryError::InvalidArgument(format!("No day after {}", self.date))
        })?;
        self.select_date(date).await
    }

    /// Jump back to today.
    pub async fn reset_date(&mut self) -> DiaryResult<()> {
        self.select_date(self.zone.today()).await
    }

    fn create_meal_groups(&self) -> Vec<MealGroup> {
        self.settings
            .meal_names
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.trim().is_empty())
            .map(|(i, name)| MealGroup::new(name.clone(), i))
            .collect()
    }

    /// Entry stored for the selected day, if any.
    pub async fn load_entry(&self) -> DiaryResult<Option<DiaryEntry>> {
        let window = self.day_window()?;
        self.store.get_day(&window).await
    }

    /// Build the grouped, enriched and totalled view of the selected day and
    /// hand it to the view.
    pub async fn render(&mut self) -> DiaryResult<DayView> {
        if self.state == RenderState::Uninitialized {
            self.groups = self.create_meal_groups();
        }

        let entry = self.load_entry().await?;

        for group in &mut self.groups {
            group.reset();
        }

        let mut totals = NutritionMap::new();
        let mut weight = None;
        if let Some(entry) = &entry {
            let enriched = self.populate_groups(entry).await?;
            totals = self.catalog.get_total_nutrition(&enriched).await?;
            weight = entry.weight().cloned();

            if !totals.approx_eq(&self.get_nutrition_totals()) {
                tracing::warn!(
                    "Catalog total for {} differs from the sum of its meal groups",
                    self.date
                );
            }
        }

        self.state = RenderState::Ready;

        let day = DayView {
            date: self.date,
            groups: self.groups.clone(),
            totals,
            weight,
        };
        tracing::debug!("Rendering {} with {} item(s)", day.date, day.item_count());
        self.view.show_day(&day);
        self.view.render_nutrition_card(&day.totals, day.date);

        Ok(day)
    }

    /// Enrich `entry.foods` in order and sort them into groups. Returns the
    /// items that landed in a group.
    async fn populate_groups(&mut self, entry: &DiaryEntry) -> DiaryResult<Vec<EnrichedItem>> {
        let mut enriched = Vec::with_capacity(entry.foods.len());

        for (index, item) in entry.foods.iter().enumerate() {
            let Some(position) = self
                .groups
                .iter()
                .position(|g| g.category_index == item.category)
            else {
                tracing::warn!(
                    "Skipping item {} of {}: no meal group for category {}",
                    index,
                    entry.date,
                    item.category
                );
                continue;
            };

            let details = self.catalog.get_food(item.id).await?;
            let nutrition = self.catalog.get_nutrition(item).await?;
            let enriched_item = EnrichedItem::new(item.clone(), details, nutrition, index);

            self.groups[position].add_item(enriched_item.clone());
            enriched.push(enriched_item);
        }

        Ok(enriched)
    }

    /// Append `items` to the selected day under `category`, creating the
    /// entry if needed.
    pub async fn add_items(&mut self, items: &[ItemDraft], category: usize) -> DiaryResult<()> {
        if items.is_empty() {
            tracing::debug!("No items to add");
            return Ok(());
        }
        for draft in items {
            if !quantity_is_valid(draft.quantity) {
                return Err(invalid_quantity(draft.quantity));
            }
        }

        let window = self.day_window()?;
        let new_items: Vec<LoggedItem> = items
            .iter()
            .map(|draft| LoggedItem::from_draft(draft, category))
            .collect();
        let count = new_items.len();

        self.store
            .update(
                &window,
                Box::new(move |entry| {
                    let mut entry = entry.unwrap_or_else(|| DiaryEntry::new(&window));
                    entry.foods.extend(new_items);
                    Ok(Some(entry))
                }),
            )
            .await?;

        tracing::info!("Added {} item(s) to {}", count, window.date);
        Ok(())
    }

    /// Replace the item at `update.index`. A day without an entry is left
    /// alone.
    pub async fn update_item(&mut self, update: &ItemUpdate) -> DiaryResult<()> {
        if !quantity_is_valid(update.quantity) {
            return Err(invalid_quantity(update.quantity));
        }

        let window = self.day_window()?;
        let update = update.clone();
        let index = update.index;

        let written = self
            .store
            .update(
                &window,
                Box::new(move |entry| {
                    let Some(mut entry) = entry else {
                        return Ok(None);
                    };
                    let at = update.index;
                    let uid = check_index(&entry, at, update.uid)?;
                    entry.foods[at] = update.into_item(uid);
                    Ok(Some(entry))
                }),
            )
            .await?;

        match written {
            Some(_) => tracing::info!("Updated item {} on {}", index, window.date),
            None => tracing::debug!("No entry for {}, nothing to update", window.date),
        }
        Ok(())
    }

    /// Remove the item at `index` once the user confirms. Returns whether
    /// anything was removed.
    pub async fn delete_item(&mut self, index: usize, uid: Option<Uuid>) -> DiaryResult<bool> {
        if !self.view.confirm("Delete", "Are you sure?") {
            tracing::debug!("Deletion of item {} cancelled", index);
            return Ok(false);
        }

        let window = self.day_window()?;
        let written = self
            .store
            .update(
                &window,
                Box::new(move |entry| {
                    let Some(mut entry) = entry else {
                        return Ok(None);
                    };
                    check_index(&entry, index, uid)?;
                    entry.foods.remove(index);
                    Ok(Some(entry))
                }),
            )
            .await?;

        if written.is_none() {
            tracing::debug!("No entry for {}, nothing to delete", window.date);
            return Ok(false);
        }

        tracing::info!("Deleted item {} from {}", index, window.date);
        self.view.refresh();
        self.state = RenderState::Uninitialized;
        self.render().await?;
        Ok(true)
    }

    /// Ask for a weight and record it. Returns `false` when cancelled.
    pub async fn log_weight(&mut self) -> DiaryResult<bool> {
        let default = self.settings.default_weight.clone();
        match self.view.prompt("Record Weight", "Weight", &default) {
            Some(value) => {
                self.set_weight(&value).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Record body weight (kg) for the selected day and remember it as the
    /// default for later days.
    pub async fn set_weight(&mut self, value: &str) -> DiaryResult<()> {
        let value = value.trim().to_string();
        match value.parse::<f64>() {
            Ok(weight) if weight.is_finite() && weight > 0.0 => {}
            _ => {
                return Err(DiaryError::InvalidArgument(format!(
                    "Weight must be a positive number, got '{}'",
                    value
                )))
            }
        }

        let window = self.day_window()?;
        let stored = value.clone();
        self.store
            .update(
                &window,
                Box::new(move |entry| {
                    let mut entry = entry.unwrap_or_else(|| DiaryEntry::new(&window));
                    entry.set_weight(stored);
                    Ok(Some(entry))
                }),
            )
            .await?;

        self.preferences.remember_weight(&value).await?;
        self.settings.default_weight = value;
        self.view.toast("Saved");
        Ok(())
    }

    /// Per-nutrient sum over every group.
    pub fn get_nutrition_totals(&self) -> NutritionMap {
        self.groups.iter().map(|g| &g.nutrition).sum()
    }
}

#[cfg(test)]
impl<S, C, V, P> DiaryController<S, C, V, P> {
    /// Interpret days in `offset` instead of the local timezone.
    pub fn with_offset(mut self, offset: chrono::FixedOffset) -> Self {
        self.zone = DayZone::Fixed(offset);
        self.date = self.zone.today();
        self
    }

    pub fn groups(&self) -> &[MealGroup] {
        &self.groups
    }

    pub fn render_state(&self) -> RenderState {
        self.state
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// Swap settings; groups are rebuilt on the next render.
    pub fn apply_settings(&mut self, settings: DiarySettings) {
        self.settings = settings;
        self.state = RenderState::Uninitialized;
    }
}

fn invalid_quantity(quantity: Option<f64>) -> DiaryError {
    DiaryError::InvalidArgument(format!(
        "Quantity must not be negative, got {}",
        quantity.unwrap_or_default()
    ))
}

/// Bounds- and identity-check a positional handle; returns the uid found.
fn check_index(entry: &DiaryEntry, index: usize, expected: Option<Uuid>) -> DiaryResult<Uuid> {
    let item = entry.foods.get(index).ok_or_else(|| {
        DiaryError::InvalidArgument(format!(
            "Item index {} out of range for {} ({} item(s))",
            index,
            entry.date,
            entry.foods.len()
        ))
    })?;

    match expected {
        Some(expected) if expected != item.uid => Err(DiaryError::StaleIndex {
            index,
            expected,
            found: item.uid,
        }),
        _ => Ok(item.uid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diary::testing::{
        food, BrokenStore, FakeCatalog, FakePreferences, FakeView, MemoryStore, ViewEvent,
    };
    use crate::models::{LoggedItem, NutrientKey, Stat};
    use chrono::{FixedOffset, TimeZone, Utc};

    type TestController = DiaryController<MemoryStore, FakeCatalog, FakeView, FakePreferences>;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn catalog() -> FakeCatalog {
        FakeCatalog::with_foods(vec![
            food(1, "Oats", &[(NutrientKey::Calories, 100.0), (NutrientKey::Fiber, 4.0)]),
            food(2, "Milk", &[(NutrientKey::Calories, 50.0), (NutrientKey::Proteins, 3.5)]),
            food(3, "Apple", &[(NutrientKey::Calories, 52.0), (NutrientKey::Sugars, 10.0)]),
        ])
    }

    async fn controller_on(date: NaiveDate) -> TestController {
        let mut controller = DiaryController::new(
            MemoryStore::default(),
            catalog(),
            FakeView::default(),
            FakePreferences::default(),
            DiarySettings::default(),
        )
        .with_offset(FixedOffset::east_opt(0).unwrap());
        controller.select_date(date).await.unwrap();
        controller
    }

    async fn stored(controller: &TestController) -> Option<DiaryEntry> {
        controller.load_entry().await.unwrap()
    }

    #[tokio::test]
    async fn test_initialize_without_entry_renders_empty_groups() {
        let mut controller = controller_on(day(15)).await;
        controller.initialize(None).await.unwrap();

        assert_eq!(controller.render_state(), RenderState::Ready);
        let names: Vec<&str> = controller.groups().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Breakfast", "Lunch", "Dinner", "Snacks"]);
        assert!(controller.groups().iter().all(|g| g.is_empty()));
        assert!(controller.get_nutrition_totals().is_empty());
        // No row is fabricated for an empty day
        assert!(stored(&controller).await.is_none());
    }

    #[tokio::test]
    async fn test_empty_meal_names_are_skipped_but_keep_their_index() {
        let mut controller = controller_on(day(15)).await;
        controller.apply_settings(DiarySettings {
            meal_names: vec!["Breakfast".into(), "".into(), "Dinner".into()],
            default_weight: "70".into(),
        });
        controller
            .add_items(&[ItemDraft::new(1, "100g")], 2)
            .await
            .unwrap();
        controller.initialize(None).await.unwrap();

        assert_eq!(controller.groups().len(), 2);
        assert_eq!(controller.groups()[1].name, "Dinner");
        assert_eq!(controller.groups()[1].category_index, 2);
        assert_eq!(controller.groups()[1].items.len(), 1);
    }

    #[tokio::test]
    async fn test_add_items_creates_entry() {
        let mut controller = controller_on(day(15)).await;
        controller
            .add_items(&[ItemDraft::new(1, "g").with_quantity(2.0)], 0)
            .await
            .unwrap();

        let entry = stored(&controller).await.unwrap();
        assert_eq!(entry.foods.len(), 1);
        assert_eq!(entry.foods[0].id, 1);
        assert_eq!(entry.foods[0].category, 0);
        assert_eq!(entry.foods[0].quantity, 2.0);
        assert_eq!(entry.date, day(15));
    }

    #[tokio::test]
    async fn test_add_empty_items_is_a_no_op() {
        let mut controller = controller_on(day(15)).await;
        controller.add_items(&[], 1).await.unwrap();
        assert!(stored(&controller).await.is_none());

        controller
            .add_items(&[ItemDraft::new(1, "g")], 0)
            .await
            .unwrap();
        controller.add_items(&[], 3).await.unwrap();
        assert_eq!(stored(&controller).await.unwrap().foods.len(), 1);
    }

    #[tokio::test]
    async fn test_add_items_appends_with_default_quantity() {
        let mut controller = controller_on(day(15)).await;
        controller
            .add_items(&[ItemDraft::new(1, "g")], 0)
            .await
            .unwrap();
        controller
            .add_items(&[ItemDraft::new(2, "ml"), ItemDraft::new(3, "g")], 1)
            .await
            .unwrap();

        let entry = stored(&controller).await.unwrap();
        let ids: Vec<i64> = entry.foods.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(entry.foods.iter().all(|f| f.quantity == 1.0));
        assert_eq!(entry.foods[2].category, 1);
    }

    #[tokio::test]
    async fn test_update_item_in_place() {
        let mut controller = controller_on(day(15)).await;
        controller
            .add_items(&[ItemDraft::new(1, "g").with_quantity(2.0)], 0)
            .await
            .unwrap();
        let uid = stored(&controller).await.unwrap().foods[0].uid;

        controller
            .update_item(&ItemUpdate::new(1, 0, "g", 0).with_quantity(3.0))
            .await
            .unwrap();

        let entry = stored(&controller).await.unwrap();
        assert_eq!(entry.foods.len(), 1);
        assert_eq!(entry.foods[0].quantity, 3.0);
        assert_eq!(entry.foods[0].uid, uid);

        let view = controller.render().await.unwrap();
        assert_eq!(view.groups[0].items[0].index, 0);
        assert_eq!(view.groups[0].items[0].item.quantity, 3.0);
    }

    #[tokio::test]
    async fn test_update_without_entry_is_a_no_op() {
        let mut controller = controller_on(day(15)).await;
        controller
            .update_item(&ItemUpdate::new(1, 0, "g", 0))
            .await
            .unwrap();
        assert!(stored(&controller).await.is_none());
    }

    #[tokio::test]
    async fn test_update_out_of_range_index_is_rejected() {
        let mut controller = controller_on(day(15)).await;
        controller
            .add_items(&[ItemDraft::new(1, "g")], 0)
            .await
            .unwrap();

        let result = controller
            .update_item(&ItemUpdate::new(2, 0, "g", 5))
            .await;
        assert!(matches!(result, Err(DiaryError::InvalidArgument(_))));

        let entry = stored(&controller).await.unwrap();
        assert_eq!(entry.foods.len(), 1);
        assert_eq!(entry.foods[0].id, 1);
    }

    #[tokio::test]
    async fn test_update_with_stale_uid_is_rejected() {
        let mut controller = controller_on(day(15)).await;
        controller
            .add_items(&[ItemDraft::new(1, "g"), ItemDraft::new(2, "g")], 0)
            .await
            .unwrap();
        let first_uid = stored(&controller).await.unwrap().foods[0].uid;

        let result = controller
            .update_item(&ItemUpdate::new(3, 0, "g", 1).expecting(first_uid))
            .await;
        assert!(matches!(
            result,
            Err(DiaryError::StaleIndex { index: 1, .. })
        ));
        assert_eq!(stored(&controller).await.unwrap().foods[1].id, 2);
    }

    #[tokio::test]
    async fn test_delete_after_confirmation() {
        let mut controller = controller_on(day(15)).await;
        controller
            .initialize(Some(InitContext::Items {
                items: vec![ItemDraft::new(1, "g")],
                category: 0,
            }))
            .await
            .unwrap();

        let deleted = controller.delete_item(0, None).await.unwrap();
        assert!(deleted);

        let entry = stored(&controller).await.unwrap();
        assert!(entry.foods.is_empty());
        assert!(controller.groups().iter().all(|g| g.is_empty()));
        assert!(controller.view().events().contains(&ViewEvent::Refresh));
    }

    #[tokio::test]
    async fn test_delete_declined_keeps_item() {
        let mut controller = controller_on(day(15)).await;
        controller
            .add_items(&[ItemDraft::new(1, "g")], 0)
            .await
            .unwrap();
        controller.view().answer_confirm(false);

        assert!(!controller.delete_item(0, None).await.unwrap());
        assert_eq!(stored(&controller).await.unwrap().foods.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_without_entry_is_a_no_op() {
        let mut controller = controller_on(day(15)).await;
        assert!(!controller.delete_item(0, None).await.unwrap());
        assert!(stored(&controller).await.is_none());
        assert!(!controller.view().events().contains(&ViewEvent::Refresh));
    }

    #[tokio::test]
    async fn test_delete_out_of_range_index_is_rejected() {
        let mut controller = controller_on(day(15)).await;
        controller
            .add_items(&[ItemDraft::new(1, "g")], 0)
            .await
            .unwrap();

        let result = controller.delete_item(3, None).await;
        assert!(matches!(result, Err(DiaryError::InvalidArgument(_))));
        assert_eq!(stored(&controller).await.unwrap().foods.len(), 1);
    }

    #[tokio::test]
    async fn test_render_groups_and_enriches_in_order() {
        let mut controller = controller_on(day(15)).await;
        controller
            .add_items(&[ItemDraft::new(1, "g"), ItemDraft::new(2, "ml")], 0)
            .await
            .unwrap();
        controller
            .add_items(&[ItemDraft::new(3, "g").with_quantity(2.0)], 2)
            .await
            .unwrap();

        let view = controller.render().await.unwrap();

        let breakfast = &view.groups[0];
        assert_eq!(breakfast.items.len(), 2);
        assert_eq!(breakfast.items[0].name, "Oats");
        assert_eq!(breakfast.items[0].index, 0);
        assert_eq!(breakfast.items[1].name, "Milk");
        assert_eq!(breakfast.items[1].index, 1);
        assert_eq!(breakfast.nutrition.get(&NutrientKey::Calories), 150.0);

        let dinner = &view.groups[2];
        assert_eq!(dinner.items[0].index, 2);
        assert_eq!(dinner.nutrition.get(&NutrientKey::Calories), 104.0);
        assert!(view.groups[1].is_empty());
    }

    #[tokio::test]
    async fn test_group_totals_match_day_total() {
        let mut controller = controller_on(day(15)).await;
        controller
            .add_items(&[ItemDraft::new(1, "g"), ItemDraft::new(3, "g")], 0)
            .await
            .unwrap();
        controller
            .add_items(&[ItemDraft::new(2, "ml").with_quantity(2.0)], 3)
            .await
            .unwrap();

        let view = controller.render().await.unwrap();
        let totals = controller.get_nutrition_totals();

        assert_eq!(totals, view.totals);
        assert_eq!(totals.get(&NutrientKey::Calories), 252.0);
        assert_eq!(totals.get(&NutrientKey::Proteins), 7.0);
        assert_eq!(totals.get(&NutrientKey::Fiber), 4.0);
        assert_eq!(totals.get(&NutrientKey::Sugars), 10.0);
    }

    #[tokio::test]
    async fn test_out_of_range_category_is_skipped() {
        let mut controller = controller_on(day(15)).await;
        controller
            .add_items(&[ItemDraft::new(1, "g")], 0)
            .await
            .unwrap();
        controller
            .add_items(&[ItemDraft::new(3, "g")], 9)
            .await
            .unwrap();

        let view = controller.render().await.unwrap();

        assert_eq!(view.item_count(), 1);
        assert!(view
            .groups
            .iter()
            .all(|g| g.nutrition.get(&NutrientKey::Sugars) == 0.0));
        assert_eq!(view.totals.get(&NutrientKey::Calories), 100.0);
    }

    #[tokio::test]
    async fn test_unknown_food_fails_render() {
        let mut controller = controller_on(day(15)).await;
        controller
            .add_items(&[ItemDraft::new(42, "g")], 0)
            .await
            .unwrap();

        let result = controller.render().await;
        assert!(matches!(result, Err(DiaryError::UnknownFood(42))));
    }

    #[tokio::test]
    async fn test_render_does_not_leak_previous_day() {
        let mut controller = controller_on(day(15)).await;
        controller
            .add_items(&[ItemDraft::new(1, "g")], 0)
            .await
            .unwrap();
        controller.initialize(None).await.unwrap();
        assert_eq!(controller.groups()[0].items.len(), 1);

        controller.next_day().await.unwrap();
        assert_eq!(controller.selected_date(), day(16));
        assert!(controller.groups().iter().all(|g| g.is_empty()));

        controller.previous_day().await.unwrap();
        assert_eq!(controller.groups()[0].items.len(), 1);
    }

    #[tokio::test]
    async fn test_select_date_before_ready_does_not_render() {
        let mut controller = controller_on(day(15)).await;
        controller.select_date(day(20)).await.unwrap();

        assert_eq!(controller.render_state(), RenderState::Uninitialized);
        assert!(controller.view().events().is_empty());
    }

    #[tokio::test]
    async fn test_initialize_twice_does_not_duplicate_groups() {
        let mut controller = controller_on(day(15)).await;
        controller.initialize(None).await.unwrap();
        controller
            .initialize(Some(InitContext::Items {
                items: vec![ItemDraft::new(2, "ml")],
                category: 1,
            }))
            .await
            .unwrap();
        controller.initialize(None).await.unwrap();

        assert_eq!(controller.groups().len(), 4);
        assert_eq!(controller.groups()[1].items.len(), 1);
    }

    #[tokio::test]
    async fn test_initialize_with_update_context() {
        let mut controller = controller_on(day(15)).await;
        controller
            .add_items(&[ItemDraft::new(1, "g")], 0)
            .await
            .unwrap();
        controller.initialize(None).await.unwrap();

        controller
            .initialize(Some(InitContext::Item(
                ItemUpdate::new(2, 1, "ml", 0).with_quantity(2.0),
            )))
            .await
            .unwrap();

        assert!(controller.groups()[0].is_empty());
        assert_eq!(controller.groups()[1].items[0].name, "Milk");
        assert_eq!(controller.get_nutrition_totals().get(&NutrientKey::Calories), 100.0);
    }

    #[tokio::test]
    async fn test_set_weight_persists_and_remembers() {
        let mut controller = controller_on(day(15)).await;
        controller.set_weight("82.5").await.unwrap();

        let entry = stored(&controller).await.unwrap();
        assert_eq!(entry.weight(), Some(&Stat::new("82.5", "kg")));
        assert!(entry.foods.is_empty());
        assert_eq!(controller.settings().default_weight, "82.5");
        assert_eq!(
            controller.preferences.last_weight().await.unwrap(),
            Some("82.5".to_string())
        );
        assert!(controller
            .view()
            .events()
            .contains(&ViewEvent::Toast("Saved".to_string())));
    }

    #[tokio::test]
    async fn test_set_weight_rejects_non_numbers() {
        let mut controller = controller_on(day(15)).await;
        for bad in ["", "heavy", "-3", "NaN"] {
            let result = controller.set_weight(bad).await;
            assert!(matches!(result, Err(DiaryError::InvalidArgument(_))));
        }
        assert!(stored(&controller).await.is_none());
    }

    #[tokio::test]
    async fn test_log_weight_offers_last_weight() {
        let mut controller = controller_on(day(15)).await;
        controller.view().answer_prompt(Some("80"));
        assert!(controller.log_weight().await.unwrap());

        controller.next_day().await.unwrap();
        controller.view().answer_prompt(None);
        assert!(!controller.log_weight().await.unwrap());

        let prompts: Vec<ViewEvent> = controller
            .view()
            .events()
            .into_iter()
            .filter(|e| matches!(e, ViewEvent::Prompt(_)))
            .collect();
        assert_eq!(
            prompts,
            vec![
                ViewEvent::Prompt("70".to_string()),
                ViewEvent::Prompt("80".to_string())
            ]
        );
        // Cancelled prompt writes nothing for the next day
        assert!(stored(&controller).await.is_none());
    }

    #[tokio::test]
    async fn test_weight_and_foods_share_the_entry() {
        let mut controller = controller_on(day(15)).await;
        controller.set_weight("75").await.unwrap();
        controller
            .add_items(&[ItemDraft::new(1, "g")], 0)
            .await
            .unwrap();

        let entry = stored(&controller).await.unwrap();
        assert_eq!(entry.foods.len(), 1);
        assert_eq!(entry.weight().unwrap().value, "75");

        let view = controller.render().await.unwrap();
        assert_eq!(view.weight, Some(Stat::new("75", "kg")));
    }

    #[tokio::test]
    async fn test_day_window_boundaries() {
        let offset = FixedOffset::east_opt(3600).unwrap();
        let mut controller = DiaryController::new(
            MemoryStore::default(),
            catalog(),
            FakeView::default(),
            FakePreferences::default(),
            DiarySettings::default(),
        )
        .with_offset(offset);

        // Entry sitting exactly on local midnight of the 16th
        let midnight_16 = offset
            .with_ymd_and_hms(2025, 1, 16, 0, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        let window_16 = DayWindow::for_date(day(16), offset).unwrap();
        assert_eq!(window_16.from, midnight_16);

        let mut entry = DiaryEntry::new(&window_16);
        entry.set_weight("70");
        controller.store.put(&entry).await.unwrap();

        controller.select_date(day(15)).await.unwrap();
        assert!(controller.load_entry().await.unwrap().is_none());

        controller.select_date(day(16)).await.unwrap();
        assert_eq!(controller.load_entry().await.unwrap().unwrap().id, entry.id);
    }

    #[tokio::test]
    async fn test_day_view_reaches_the_view() {
        let mut controller = controller_on(day(15)).await;
        controller
            .add_items(&[ItemDraft::new(3, "g")], 1)
            .await
            .unwrap();
        controller.initialize(None).await.unwrap();

        let events = controller.view().events();
        assert_eq!(
            events,
            vec![
                ViewEvent::ShowDay(day(15), 1),
                ViewEvent::NutritionCard(day(15), 52.0)
            ]
        );
    }

    #[tokio::test]
    async fn test_negative_quantity_is_rejected() {
        let mut controller = controller_on(day(15)).await;
        let drafts = [
            ItemDraft::new(1, "g"),
            ItemDraft::new(2, "ml").with_quantity(-2.0),
        ];
        let result = controller.add_items(&drafts, 0).await;
        assert!(matches!(result, Err(DiaryError::InvalidArgument(_))));
        assert!(stored(&controller).await.is_none());

        let result = controller
            .add_items(&[ItemDraft::new(1, "g").with_quantity(f64::INFINITY)], 0)
            .await;
        assert!(matches!(result, Err(DiaryError::InvalidArgument(_))));

        controller
            .add_items(&[ItemDraft::new(1, "g").with_quantity(2.0)], 0)
            .await
            .unwrap();
        let result = controller
            .update_item(&ItemUpdate::new(1, 0, "g", 0).with_quantity(-1.0))
            .await;
        assert!(matches!(result, Err(DiaryError::InvalidArgument(_))));
        assert_eq!(stored(&controller).await.unwrap().foods[0].quantity, 2.0);
    }

    #[tokio::test]
    async fn test_navigation_stops_at_the_edge_of_the_calendar() {
        let mut controller = controller_on(NaiveDate::MIN).await;
        let result = controller.previous_day().await;
        assert!(matches!(result, Err(DiaryError::InvalidArgument(_))));
        assert_eq!(controller.selected_date(), NaiveDate::MIN);

        let mut controller = controller_on(NaiveDate::MAX).await;
        let result = controller.next_day().await;
        assert!(matches!(result, Err(DiaryError::InvalidArgument(_))));
        assert_eq!(controller.selected_date(), NaiveDate::MAX);

        // The last date has no following midnight to close its window
        let result = controller.add_items(&[ItemDraft::new(1, "g")], 0).await;
        assert!(matches!(result, Err(DiaryError::InvalidArgument(_))));
    }

    fn broken_controller() -> DiaryController<BrokenStore, FakeCatalog, FakeView, FakePreferences>
    {
        let window = DayWindow::for_date(day(15), FixedOffset::east_opt(0).unwrap()).unwrap();
        let entry = DiaryEntry::new(&window)
            .with_foods(vec![LoggedItem::new(1, "g", Some(1.0), 0)]);
        let mut controller = DiaryController::new(
            BrokenStore::holding(entry),
            catalog(),
            FakeView::default(),
            FakePreferences::default(),
            DiarySettings::default(),
        )
        .with_offset(FixedOffset::east_opt(0).unwrap());
        controller.date = day(15);
        controller
    }

    #[tokio::test]
    async fn test_store_write_failures_propagate() {
        let mut controller = broken_controller();

        let result = controller.add_items(&[ItemDraft::new(2, "ml")], 1).await;
        assert!(matches!(result, Err(DiaryError::Store(_))));

        let result = controller
            .update_item(&ItemUpdate::new(3, 0, "g", 0))
            .await;
        assert!(matches!(result, Err(DiaryError::Store(_))));

        let result = controller.delete_item(0, None).await;
        assert!(matches!(result, Err(DiaryError::Store(_))));

        let result = controller.set_weight("80").await;
        assert!(matches!(result, Err(DiaryError::Store(_))));

        // Nothing was shown as if it had been saved
        let events = controller.view().events();
        assert_eq!(events, vec![ViewEvent::Confirm]);
    }

    #[tokio::test]
    async fn test_failed_weight_write_is_not_remembered() {
        let mut controller = broken_controller();

        let result = controller.set_weight("82.5").await;
        assert!(matches!(result, Err(DiaryError::Store(_))));

        assert_eq!(controller.preferences.last_weight().await.unwrap(), None);
        assert_eq!(controller.settings().default_weight, "70");
        assert!(!controller
            .view()
            .events()
            .contains(&ViewEvent::Toast("Saved".to_string())));
    }

    #[tokio::test]
    async fn test_day_written_under_another_offset_is_the_same_day() {
        let june = |d| NaiveDate::from_ymd_opt(2025, 6, d).unwrap();
        let summer = FixedOffset::east_opt(2 * 3600).unwrap();
        let winter = FixedOffset::east_opt(3600).unwrap();

        let mut controller = controller_on(day(15)).await.with_offset(summer);
        controller.select_date(june(1)).await.unwrap();
        controller
            .add_items(&[ItemDraft::new(3, "g")], 0)
            .await
            .unwrap();

        // Same store, days now interpreted one hour further west
        let mut controller = controller.with_offset(winter);
        controller.initialize(None).await.unwrap();
        controller.select_date(june(1)).await.unwrap();
        assert_eq!(controller.load_entry().await.unwrap().unwrap().foods.len(), 1);
        assert_eq!(controller.render().await.unwrap().item_count(), 1);

        controller.previous_day().await.unwrap();
        assert!(controller.load_entry().await.unwrap().is_none());

        controller.next_day().await.unwrap();
        controller
            .add_items(&[ItemDraft::new(1, "g")], 1)
            .await
            .unwrap();
        assert_eq!(controller.load_entry().await.unwrap().unwrap().foods.len(), 2);
    }
}
