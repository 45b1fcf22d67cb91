// src/lib.rs

pub mod calendar;
pub mod dirs;
pub mod merge;
pub mod page;
pub mod table;
pub mod years;
