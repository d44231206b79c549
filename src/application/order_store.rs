use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::errors::DomainError;
use crate::domain::events::{EventBus, OrderEvent, SubscriptionId};
use crate::domain::money::line_sum;
use crate::domain::optimistic::{OptimisticUpdate, Settled};
use crate::domain::order::{Order, OrderStatus};
use crate::domain::ports::{KeyValueStore, OrderPlacer, OrderRepository};

pub const ORDERS_CACHE_KEY: &str = "orders";

/// Orders held in memory, mirrored into a local cache and written through to
/// the authoritative repository.
///
/// Memory and cache always hold the same list. The repository may lag while
/// a write is in flight; if that write fails both are put back to the last
/// list the repository accepted.
pub struct OrderStore<R> {
    repo: R,
    cache: Arc<dyn KeyValueStore>,
    orders: Vec<Order>,
    loaded: bool,
    events: EventBus<OrderEvent>,
}

impl<R: OrderRepository> OrderStore<R> {
    pub fn new(repo: R, cache: Arc<dyn KeyValueStore>) -> Self {
        Self {
            repo,
            cache,
            orders: Vec::new(),
            loaded: false,
            events: EventBus::new(),
        }
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&OrderEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(listener)
    }

    /// The list as last loaded or changed, without touching storage.
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    fn read_cache(&self) -> Option<Vec<Order>> {
        let raw = self.cache.get(ORDERS_CACHE_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(orders) => Some(orders),
            Err(e) => {
                log::warn!("Ignoring unreadable order cache: {}", e);
                None
            }
        }
    }

    fn sync_cache(&self) {
        match serde_json::to_string(&self.orders) {
            Ok(raw) => self.cache.set(ORDERS_CACHE_KEY, raw),
            Err(e) => log::error!("Failed to serialise orders for the cache: {}", e),
        }
    }

    fn adopt(&mut self, orders: Vec<Order>) {
        let changed = !self.loaded || self.orders != orders;
        self.orders = orders;
        self.loaded = true;
        if changed {
            self.events.publish(&OrderEvent::Changed {
                orders: self.orders.clone(),
            });
        }
    }

    /// Read-through: the cache when present, otherwise the repository (which
    /// then fills the cache). Entries never expire.
    pub fn load_orders(&mut self) -> Result<&[Order], DomainError> {
        match self.read_cache() {
            Some(cached) => self.adopt(cached),
            None => {
                let fetched = self.repo.load_all()?;
                log::debug!("Order cache miss; loaded {} orders", fetched.len());
                self.adopt(fetched);
                self.sync_cache();
            }
        }
        Ok(&self.orders)
    }

    /// Drops the cached copy and reads the repository again.
    pub fn refresh(&mut self) -> Result<&[Order], DomainError> {
        let fetched = self.repo.load_all()?;
        self.adopt(fetched);
        self.sync_cache();
        Ok(&self.orders)
    }

    fn ensure_loaded(&mut self) -> Result<(), DomainError> {
        if !self.loaded {
            self.load_orders()?;
        }
        Ok(())
    }

    pub fn find(&mut self, id: &str) -> Result<Option<&Order>, DomainError> {
        self.ensure_loaded()?;
        Ok(self.orders.iter().find(|o| o.id == id))
    }

    /// Applies `mutation` locally, publishes the new list, then writes it
    /// through. A refused mutation changes nothing; a failed write is undone.
    fn optimistic<F>(&mut self, subject: &str, mutation: F) -> Result<(), DomainError>
    where
        F: FnOnce(&mut Vec<Order>) -> Result<(), DomainError>,
    {
        self.ensure_loaded()?;
        let update = OptimisticUpdate::snapshot(&self.orders);
        update.apply(&mut self.orders, mutation)?;

        self.sync_cache();
        self.events.publish(&OrderEvent::Changed {
            orders: self.orders.clone(),
        });

        let written = self.repo.replace_all(&self.orders);
        match update.commit_or_rollback(&mut self.orders, written) {
            Settled::Committed => Ok(()),
            Settled::RolledBack(e) => {
                self.sync_cache();
                log::warn!("Rolled back change to {}: {}", subject, e);
                self.events.publish(&OrderEvent::RolledBack {
                    order_id: subject.to_string(),
                    message: e.to_string(),
                });
                self.events.publish(&OrderEvent::Changed {
                    orders: self.orders.clone(),
                });
                Err(e)
            }
        }
    }

    /// Optimistic status change. Delivered orders are locked.
    pub fn set_order_status(&mut self, order_id: &str, status: OrderStatus) -> Result<(), DomainError> {
        self.ensure_loaded()?;
        let current = self
            .orders
            .iter()
            .find(|o| o.id == order_id)
            .ok_or_else(|| DomainError::NotFound(format!("Order {order_id}")))?;
        if current.status.is_terminal() {
            return Err(DomainError::TerminalStatus(order_id.to_string()));
        }
        if current.status == status {
            return Ok(());
        }

        self.optimistic(order_id, |orders| {
            if let Some(order) = orders.iter_mut().find(|o| o.id == order_id) {
                order.status = status;
            }
            Ok(())
        })?;

        log::info!("Order {} is now {}", order_id, status);
        self.events.publish(&OrderEvent::StatusChanged {
            order_id: order_id.to_string(),
            status,
        });
        Ok(())
    }

    /// Replaces the collection wholesale, as the admin bulk save does.
    ///
    /// Existing orders may only change status, and never out of delivered.
    /// None may be dropped. New orders must carry a total matching their lines.
    pub fn replace_all(&mut self, incoming: Vec<Order>) -> Result<(), DomainError> {
        self.ensure_loaded()?;
        let next = reconcile(&self.orders, incoming)?;
        self.optimistic("orders", move |orders| {
            *orders = next;
            Ok(())
        })
    }

    /// Counts of orders still being prepared.
    pub fn in_progress_count(&self) -> usize {
        self.orders
            .iter()
            .filter(|o| o.status == OrderStatus::InProgress)
            .count()
    }
}

/// Builds the list to store from an incoming collection. Known orders keep
/// their stored snapshot and only take the incoming status.
fn reconcile(current: &[Order], incoming: Vec<Order>) -> Result<Vec<Order>, DomainError> {
    let mut seen = HashSet::new();
    let mut next = Vec::with_capacity(incoming.len());

    for order in incoming {
        if !seen.insert(order.id.clone()) {
            return Err(DomainError::InvalidInput(format!(
                "order {} appears twice",
                order.id
            )));
        }
        match current.iter().find(|o| o.id == order.id) {
            Some(existing) => {
                if existing.status.is_terminal() && existing.status != order.status {
                    return Err(DomainError::TerminalStatus(order.id));
                }
                let mut unchanged = order.clone();
                unchanged.status = existing.status;
                if &unchanged != existing {
                    return Err(DomainError::InvalidInput(format!(
                        "order {} can only change status",
                        order.id
                    )));
                }
                let mut kept = existing.clone();
                kept.status = order.status;
                next.push(kept);
            }
            None => {
                let expected = line_sum(order.items.iter().map(|l| (&l.price, l.quantity)));
                if order.total != expected {
                    return Err(DomainError::InvalidInput(format!(
                        "order {} total {} does not match its lines ({})",
                        order.id, order.total, expected
                    )));
                }
                next.push(order);
            }
        }
    }

    if let Some(missing) = current.iter().find(|o| !seen.contains(&o.id)) {
        return Err(DomainError::InvalidInput(format!(
            "order {} cannot be removed",
            missing.id
        )));
    }
    Ok(next)
}

impl<R: OrderRepository> OrderPlacer for OrderStore<R> {
    fn place_order(&mut self, order: Order) -> Result<(), DomainError> {
        let order_id = order.id.clone();
        let code = order.code.clone();
        self.optimistic(&order_id, move |orders| {
            if orders.iter().any(|o| o.id == order.id) {
                return Err(DomainError::InvalidInput(format!(
                    "order {} already exists",
                    order.id
                )));
            }
            orders.push(order);
            Ok(())
        })?;

        log::info!("Placed order {} ({})", code, order_id);
        self.events.publish(&OrderEvent::Placed { order_id, code });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Mutex;

    use bigdecimal::BigDecimal;
    use chrono::Utc;

    use super::*;
    use crate::domain::order::OrderLine;
    use crate::infrastructure::memory_kv::InMemoryKeyValueStore;

    /// Repository double whose writes can be made to fail.
    #[derive(Default)]
    struct FakeRepo {
        stored: Mutex<Vec<Order>>,
        loads: Mutex<usize>,
        fail_writes: Mutex<bool>,
    }

    impl OrderRepository for Arc<FakeRepo> {
        fn load_all(&self) -> Result<Vec<Order>, DomainError> {
            *self.loads.lock().unwrap() += 1;
            Ok(self.stored.lock().unwrap().clone())
        }

        fn replace_all(&self, orders: &[Order]) -> Result<(), DomainError> {
            if *self.fail_writes.lock().unwrap() {
                return Err(DomainError::Persistence("network down".into()));
            }
            *self.stored.lock().unwrap() = orders.to_vec();
            Ok(())
        }
    }

    fn order(id: &str, status: OrderStatus) -> Order {
        Order {
            id: id.to_string(),
            code: format!("SB-{id}"),
            user_id: "u1".into(),
            user_name: "Ana".into(),
            items: vec![OrderLine {
                id: "7".into(),
                name: "Clay mask".into(),
                price: BigDecimal::from_str("20.00").unwrap(),
                quantity: 1,
            }],
            total: BigDecimal::from_str("20.00").unwrap(),
            status,
            date: Utc::now(),
            shipping_address: "Calle Luna 4".into(),
            payment_method: None,
        }
    }

    fn setup(
        seed: Vec<Order>,
    ) -> (
        OrderStore<Arc<FakeRepo>>,
        Arc<FakeRepo>,
        Arc<InMemoryKeyValueStore>,
        Arc<Mutex<Vec<OrderEvent>>>,
    ) {
        let repo = Arc::new(FakeRepo::default());
        *repo.stored.lock().unwrap() = seed;
        let cache = Arc::new(InMemoryKeyValueStore::new());
        let mut store = OrderStore::new(repo.clone(), cache.clone());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        store.subscribe(move |e| sink.lock().unwrap().push(e.clone()));
        (store, repo, cache, events)
    }

    fn cached(cache: &InMemoryKeyValueStore) -> Vec<Order> {
        serde_json::from_str(&cache.get(ORDERS_CACHE_KEY).unwrap()).unwrap()
    }

    fn notices(events: &Mutex<Vec<OrderEvent>>) -> usize {
        events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, OrderEvent::RolledBack { .. }))
            .count()
    }

    #[test]
    fn load_is_read_through_and_never_refetches() {
        let (mut store, repo, cache, _) = setup(vec![order("order-1", OrderStatus::InProgress)]);

        assert_eq!(store.load_orders().unwrap().len(), 1);
        assert_eq!(cached(&cache).len(), 1);

        repo.stored.lock().unwrap().clear();
        assert_eq!(store.load_orders().unwrap().len(), 1);
        assert_eq!(*repo.loads.lock().unwrap(), 1);
    }

    #[test]
    fn load_prefers_an_existing_cache() {
        let (mut store, repo, cache, _) = setup(vec![]);
        let prefilled = vec![order("c1", OrderStatus::Delivered)];
        cache.set(ORDERS_CACHE_KEY, serde_json::to_string(&prefilled).unwrap());

        assert_eq!(store.load_orders().unwrap(), prefilled.as_slice());
        assert_eq!(*repo.loads.lock().unwrap(), 0);
    }

    #[test]
    fn refresh_rereads_the_repository() {
        let (mut store, repo, _, _) = setup(vec![]);
        store.load_orders().unwrap();
        repo.stored
            .lock()
            .unwrap()
            .push(order("late", OrderStatus::InProgress));

        assert_eq!(store.refresh().unwrap().len(), 1);
    }

    #[test]
    fn status_change_updates_memory_cache_and_repository() {
        let (mut store, repo, cache, events) =
            setup(vec![order("order-1", OrderStatus::InProgress)]);

        store
            .set_order_status("order-1", OrderStatus::Delivered)
            .unwrap();

        assert_eq!(store.orders()[0].status, OrderStatus::Delivered);
        assert_eq!(cached(&cache)[0].status, OrderStatus::Delivered);
        assert_eq!(repo.stored.lock().unwrap()[0].status, OrderStatus::Delivered);
        assert_eq!(notices(&events), 0);
        assert!(events.lock().unwrap().contains(&OrderEvent::StatusChanged {
            order_id: "order-1".into(),
            status: OrderStatus::Delivered,
        }));
    }

    #[test]
    fn failed_write_rolls_back_memory_and_cache_with_one_notice() {
        let (mut store, repo, cache, events) = setup(vec![
            order("order-1", OrderStatus::InProgress),
            order("order-2", OrderStatus::InProgress),
        ]);
        store.load_orders().unwrap();
        let before = store.orders().to_vec();
        let cache_before = cache.get(ORDERS_CACHE_KEY);
        *repo.fail_writes.lock().unwrap() = true;

        let err = store
            .set_order_status("order-1", OrderStatus::Delivered)
            .unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(store.orders(), before.as_slice());
        assert_eq!(cached(&cache), before);
        assert_eq!(cache.get(ORDERS_CACHE_KEY), cache_before);
        assert_eq!(store.orders()[0].status, OrderStatus::InProgress);
        assert_eq!(notices(&events), 1);
    }

    #[test]
    fn optimistic_change_is_visible_before_the_write() {
        let (mut store, _, _, events) = setup(vec![order("order-1", OrderStatus::InProgress)]);
        store.load_orders().unwrap();
        events.lock().unwrap().clear();

        store
            .set_order_status("order-1", OrderStatus::Delivered)
            .unwrap();

        let first = events.lock().unwrap()[0].clone();
        match first {
            OrderEvent::Changed { orders } => {
                assert_eq!(orders[0].status, OrderStatus::Delivered)
            }
            other => panic!("expected Changed first, got {other:?}"),
        }
    }

    #[test]
    fn delivered_orders_are_locked() {
        let (mut store, repo, _, _) = setup(vec![order("done", OrderStatus::Delivered)]);

        let err = store
            .set_order_status("done", OrderStatus::InProgress)
            .unwrap_err();
        assert!(matches!(err, DomainError::TerminalStatus(_)));

        let reverted = order("done", OrderStatus::InProgress);
        let err = store.replace_all(vec![reverted]).unwrap_err();
        assert!(matches!(err, DomainError::TerminalStatus(_)));
        assert_eq!(repo.stored.lock().unwrap()[0].status, OrderStatus::Delivered);
    }

    #[test]
    fn unknown_order_is_not_found() {
        let (mut store, _, _, _) = setup(vec![]);
        assert!(matches!(
            store.set_order_status("nope", OrderStatus::Delivered),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn place_order_appends_and_rolls_back_on_failure() {
        let (mut store, repo, cache, events) = setup(vec![]);

        store.place_order(order("a", OrderStatus::InProgress)).unwrap();
        assert_eq!(repo.stored.lock().unwrap().len(), 1);
        assert_eq!(store.in_progress_count(), 1);

        *repo.fail_writes.lock().unwrap() = true;
        assert!(store.place_order(order("b", OrderStatus::InProgress)).is_err());
        assert_eq!(store.orders().len(), 1);
        assert_eq!(cached(&cache).len(), 1);
        assert_eq!(notices(&events), 1);
    }

    #[test]
    fn duplicate_order_id_is_refused_without_a_write() {
        let (mut store, repo, _, events) = setup(vec![order("a", OrderStatus::InProgress)]);
        *repo.fail_writes.lock().unwrap() = true;

        let err = store.place_order(order("a", OrderStatus::InProgress)).unwrap_err();

        assert!(matches!(err, DomainError::InvalidInput(_)));
        assert_eq!(store.orders().len(), 1);
        assert_eq!(notices(&events), 0);
    }

    #[test]
    fn replace_all_changes_status_only() {
        let (mut store, repo, _, _) = setup(vec![
            order("order-1", OrderStatus::InProgress),
            order("order-2", OrderStatus::Delivered),
        ]);
        store.load_orders().unwrap();

        let mut delivered = store.orders()[0].clone();
        delivered.status = OrderStatus::Delivered;
        let kept = store.orders()[1].clone();
        store.replace_all(vec![delivered, kept]).unwrap();

        let stored = repo.stored.lock().unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].status, OrderStatus::Delivered);
        assert_eq!(stored[0].total.to_string(), "20.00");
    }

    #[test]
    fn replace_all_refuses_snapshot_edits() {
        let (mut store, repo, cache, events) = setup(vec![
            order("order-1", OrderStatus::InProgress),
            order("order-2", OrderStatus::Delivered),
        ]);
        store.load_orders().unwrap();
        let before = store.orders().to_vec();

        let mut cheaper = before[0].clone();
        cheaper.total = BigDecimal::from(1);
        cheaper.items[0].price = BigDecimal::from(1);
        let err = store
            .replace_all(vec![cheaper, before[1].clone()])
            .unwrap_err();

        assert!(matches!(err, DomainError::InvalidInput(_)));
        assert_eq!(store.orders(), before.as_slice());
        assert_eq!(cached(&cache), before);
        assert_eq!(repo.stored.lock().unwrap().as_slice(), before.as_slice());
        assert_eq!(notices(&events), 0);
    }

    #[test]
    fn replace_all_refuses_dropping_orders() {
        let (mut store, repo, _, _) = setup(vec![
            order("order-1", OrderStatus::InProgress),
            order("order-2", OrderStatus::Delivered),
        ]);
        store.load_orders().unwrap();
        let first = store.orders()[0].clone();

        let err = store.replace_all(vec![first]).unwrap_err();

        assert!(matches!(err, DomainError::InvalidInput(_)));
        assert_eq!(repo.stored.lock().unwrap().len(), 2);
    }

    #[test]
    fn replace_all_checks_new_order_totals() {
        let (mut store, repo, _, _) = setup(vec![order("order-1", OrderStatus::InProgress)]);
        store.load_orders().unwrap();
        let existing = store.orders()[0].clone();

        let mut bogus = order("order-9", OrderStatus::InProgress);
        bogus.total = BigDecimal::from(99);
        let err = store
            .replace_all(vec![existing.clone(), bogus])
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));

        store
            .replace_all(vec![existing, order("order-9", OrderStatus::InProgress)])
            .unwrap();
        assert_eq!(repo.stored.lock().unwrap().len(), 2);
    }

    #[test]
    fn replace_all_refuses_duplicate_ids() {
        let (mut store, _, _, _) = setup(vec![]);
        let err = store
            .replace_all(vec![
                order("a", OrderStatus::InProgress),
                order("a", OrderStatus::InProgress),
            ])
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }
}
