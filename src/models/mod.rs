pub mod checkin;
pub mod diary;
pub mod recommendation;
pub mod stats;
pub mod user;
