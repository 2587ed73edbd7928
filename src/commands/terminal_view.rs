use chrono::NaiveDate;
use std::io::{self, BufRead, Write};

use super::OutputFormat;
use crate::diary::{DayView, DiaryView};
use crate::models::{EnrichedItem, NutrientKey, NutritionMap};

/// Nutrients shown on the summary card, in order.
const CARD_NUTRIENTS: [NutrientKey; 4] = [
    NutrientKey::Calories,
    NutrientKey::Proteins,
    NutrientKey::Carbohydrates,
    NutrientKey::Fat,
];

/// Prints the diary to stdout and asks questions on stdin.
pub struct TerminalView {
    format: OutputFormat,
    assume_yes: bool,
}

impl TerminalView {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            assume_yes: false,
        }
    }

    /// Answer every confirmation with yes.
    pub fn assume_yes(mut self, yes: bool) -> Self {
        self.assume_yes = yes;
        self
    }

    fn read_line(question: &str) -> io::Result<String> {
        print!("{}", question);
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().lock().read_line(&mut input)?;
        Ok(input.trim().to_string())
    }
}

fn format_amount(amount: f64) -> String {
    let rounded = (amount * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{:.0}", rounded)
    } else {
        format!("{:.1}", rounded)
    }
}

fn format_item(item: &EnrichedItem) -> String {
    let name = match &item.brand {
        Some(brand) => format!("{} ({})", item.name, brand),
        None => item.name.clone(),
    };
    let recipe = if item.recipe { " [recipe]" } else { "" };
    format!(
        "  [{}] {}{} - {} x{}  {} kcal",
        item.index,
        name,
        recipe,
        item.item.portion,
        format_amount(item.item.quantity),
        format_amount(item.nutrition.get(&NutrientKey::Calories))
    )
}

/// Text rendering of a day, one meal group after another.
pub fn format_day(day: &DayView) -> String {
    let mut lines = vec![day.date.format("%A, %-d %B %Y").to_string()];
    lines.push("=".repeat(lines[0].len()));
    if let Some(weight) = &day.weight {
        lines.push(format!("Weight: {}", weight));
    }

    for group in &day.groups {
        lines.push(String::new());
        lines.push(format!(
            "{} ({} kcal)",
            group.name,
            format_amount(group.nutrition.get(&NutrientKey::Calories))
        ));
        if group.is_empty() {
            lines.push("  (nothing logged)".to_string());
        }
        for item in &group.items {
            lines.push(format_item(item));
        }
    }

    lines.join("\n")
}

fn format_nutrient(key: &NutrientKey, amount: f64) -> String {
    match key.unit() {
        "" => format!("{} {}", key, format_amount(amount)),
        unit => format!("{} {} {}", key, format_amount(amount), unit),
    }
}

/// One-line summary of the main nutrients, followed by any others present.
pub fn format_card(totals: &NutritionMap) -> String {
    if totals.is_empty() {
        return "Total: nothing logged".to_string();
    }

    let mut parts: Vec<String> = CARD_NUTRIENTS
        .iter()
        .map(|key| format_nutrient(key, totals.get(key)))
        .collect();

    for (key, amount) in totals.iter() {
        if !CARD_NUTRIENTS.contains(key) {
            parts.push(format_nutrient(key, *amount));
        }
    }

    format!("Total: {}", parts.join(", "))
}

impl DiaryView for TerminalView {
    fn show_day(&self, day: &DayView) {
        match self.format {
            OutputFormat::Json => match serde_json::to_string_pretty(day) {
                Ok(json) => println!("{}", json),
                Err(e) => tracing::error!("Failed to serialize {}: {}", day.date, e),
            },
            OutputFormat::Text => println!("{}", format_day(day)),
        }
    }

    fn render_nutrition_card(&self, totals: &NutritionMap, date: NaiveDate) {
        // JSON output already carries the totals
        if let OutputFormat::Text = self.format {
            println!();
            println!("{}", format_card(totals));
        }
        tracing::debug!("Rendered nutrition card for {}", date);
    }

    fn confirm(&self, title: &str, text: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        match Self::read_line(&format!("{}: {} [y/N] ", title, text)) {
            Ok(answer) => answer.eq_ignore_ascii_case("y"),
            Err(e) => {
                tracing::warn!("Could not read confirmation: {}", e);
                false
            }
        }
    }

    fn prompt(&self, title: &str, text: &str, default: &str) -> Option<String> {
        println!("{}", title);
        match Self::read_line(&format!("{} [{}]: ", text, default)) {
            Ok(answer) if answer.is_empty() => Some(default.to_string()),
            Ok(answer) if answer.eq_ignore_ascii_case("q") => None,
            Ok(answer) => Some(answer),
            Err(e) => {
                tracing::warn!("Could not read answer: {}", e);
                None
            }
        }
    }

    fn toast(&self, message: &str) {
        println!("{}", message);
    }

    fn refresh(&self) {
        if let OutputFormat::Text = self.format {
            println!();
        }
    }
}
