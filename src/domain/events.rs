use std::fmt;
use std::sync::Arc;

use super::order::{Order, OrderStatus};

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// Typed publish/subscribe channel owned by an aggregate.
///
/// Listeners run synchronously on the publishing thread, in subscription order.
pub struct EventBus<E> {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener<E>)>,
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            listeners: Vec::new(),
        }
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    pub fn publish(&self, event: &E) {
        for (_, listener) in &self.listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Confirmation signals raised by the cart.
#[derive(Debug, Clone, PartialEq)]
pub enum CartEvent {
    ItemAdded { name: String, quantity: u32 },
    QuantityChanged { name: String, quantity: u32 },
    ItemRemoved { name: String },
    Cleared,
}

impl CartEvent {
    /// Short user-facing message for a toast.
    pub fn message(&self) -> String {
        match self {
            CartEvent::ItemAdded { name, quantity } => {
                format!("{name} added to cart ({quantity})")
            }
            CartEvent::QuantityChanged { name, quantity } => {
                format!("{name} quantity set to {quantity}")
            }
            CartEvent::ItemRemoved { name } => format!("{name} removed from cart"),
            CartEvent::Cleared => "Cart emptied".to_string(),
        }
    }
}

/// Change signals raised by the order store.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderEvent {
    /// The observable order list changed (optimistically or by a reload).
    Changed { orders: Vec<Order> },
    StatusChanged { order_id: String, status: OrderStatus },
    Placed { order_id: String, code: String },
    /// An optimistic change was reverted; this is the user-facing error notice.
    RolledBack { order_id: String, message: String },
}
