pub mod process;
pub mod ui;
