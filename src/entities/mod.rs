pub mod banner;
pub mod blog_post;
pub mod category;
pub mod combo;
pub mod coupon;
pub mod coupon_usage;
pub mod lead;
pub mod order;
pub mod order_item;
pub mod product;
