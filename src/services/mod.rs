pub mod catalog;
pub mod content;
pub mod coupons;
pub mod leads;
pub mod orders;
pub mod payments;
pub mod shipping;
pub mod uploads;
