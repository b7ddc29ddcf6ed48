pub mod auth;
pub mod checkins;
pub mod diary;
pub mod health;
pub mod stats;
