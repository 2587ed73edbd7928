mod config_cmd;
mod diary;
mod food;
mod terminal_view;

pub use config_cmd::ConfigCommand;
pub use diary::DiaryCommand;
pub use food::FoodCommand;
pub use terminal_view::TerminalView;

use clap::ValueEnum;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
