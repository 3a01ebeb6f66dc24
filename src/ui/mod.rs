//! Ratatui front-end: a tab per collection, modal forms for add/edit/lend, and
//! confirmation dialogs for deletes and returns.

mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
