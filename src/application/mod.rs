pub mod cart_store;
pub mod catalog_store;
pub mod dashboard;
pub mod order_store;
