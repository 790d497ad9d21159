pub mod catalog;
pub mod common;
pub mod content;
pub mod coupons;
pub mod leads;
pub mod orders;
pub mod uploads;
