//! Diary core: day selection, grouping, enrichment and totals.

mod controller;
mod error;
mod ports;

#[cfg(test)]
pub mod testing;

pub use controller::{DiaryController, DiarySettings, InitContext};
pub use error::{DiaryError, DiaryResult};
pub use ports::{DayView, DiaryView, EntryEdit, EntryStore, FoodsCatalog, Preferences};
