pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod errors;
pub mod events;
pub mod money;
pub mod optimistic;
pub mod order;
pub mod ports;
pub mod product;
pub mod user;
