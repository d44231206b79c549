use std::sync::Arc;

use super::errors::DomainError;
use super::order::Order;
use super::product::Product;
use super::user::User;

/// Authoritative order document. Writes replace the whole collection.
pub trait OrderRepository: Send + Sync + 'static {
    fn load_all(&self) -> Result<Vec<Order>, DomainError>;
    fn replace_all(&self, orders: &[Order]) -> Result<(), DomainError>;
}

/// Read-only product fixture.
pub trait ProductSource: Send + Sync + 'static {
    fn load_all(&self) -> Result<Vec<Product>, DomainError>;
}

pub trait UserRepository: Send + Sync + 'static {
    fn find(&self, id: &str) -> Result<Option<User>, DomainError>;
    fn save_address(&self, id: &str, address: &str) -> Result<(), DomainError>;
}

/// A change seen by storage subscribers; `value` is `None` on removal.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageChange {
    pub key: String,
    pub value: Option<String>,
}

pub type StorageListener = Arc<dyn Fn(&StorageChange) + Send + Sync>;

/// String key-value storage with change notifications, shared by the stores
/// as their local cache.
pub trait KeyValueStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
    fn subscribe(&self, listener: StorageListener);
}

/// Where the checkout hands a confirmed order.
pub trait OrderPlacer {
    fn place_order(&mut self, order: Order) -> Result<(), DomainError>;
}
