pub mod history;
pub mod rules;
pub mod sentiment;
pub mod weekly;
