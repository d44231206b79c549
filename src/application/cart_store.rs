use std::sync::Arc;

use crate::domain::cart::{Cart, CartItem};
use crate::domain::errors::DomainError;
use crate::domain::ports::KeyValueStore;

/// Keeps one cart per shopping session in the key-value store.
pub struct CartStore {
    kv: Arc<dyn KeyValueStore>,
}

fn cart_key(session: &str) -> String {
    format!("cart:{session}")
}

impl CartStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// An unknown session, or an unreadable entry, is an empty cart.
    pub fn load(&self, session: &str) -> Cart {
        let Some(raw) = self.kv.get(&cart_key(session)) else {
            return Cart::new();
        };
        match serde_json::from_str::<Vec<CartItem>>(&raw) {
            Ok(items) => Cart::from_items(items),
            Err(e) => {
                log::warn!("Discarding unreadable cart for session {}: {}", session, e);
                Cart::new()
            }
        }
    }

    pub fn save(&self, session: &str, cart: &Cart) -> Result<(), DomainError> {
        let key = cart_key(session);
        if cart.is_empty() {
            self.kv.remove(&key);
        } else {
            self.kv.set(&key, serde_json::to_string(cart.items())?);
        }
        Ok(())
    }
}
