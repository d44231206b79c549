use std::sync::{Arc, Mutex, MutexGuard};

use crate::application::cart_store::CartStore;
use crate::application::catalog_store::CatalogStore;
use crate::application::dashboard::Dashboard;
use crate::application::order_store::OrderStore;
use crate::config::AppConfig;
use crate::domain::errors::DomainError;
use crate::domain::ports::KeyValueStore;
use crate::infrastructure::json_file::{
    JsonFileOrderRepository, JsonFileProductSource, JsonFileUserRepository,
};
use crate::infrastructure::memory_kv::InMemoryKeyValueStore;

pub type Orders = OrderStore<JsonFileOrderRepository>;

/// Shared by every worker; handlers reach it through `web::Data`.
pub struct AppState {
    pub catalog: CatalogStore<JsonFileProductSource>,
    pub carts: CartStore,
    pub users: JsonFileUserRepository,
    pub dashboard: Dashboard,
    orders: Mutex<Orders>,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Self {
        let kv: Arc<dyn KeyValueStore> = Arc::new(InMemoryKeyValueStore::new());
        let mut orders = OrderStore::new(
            JsonFileOrderRepository::new(config.orders_path()),
            kv.clone(),
        );
        let dashboard = Dashboard::attach(&mut orders);

        Self {
            catalog: CatalogStore::new(
                JsonFileProductSource::new(config.products_path()),
                kv.clone(),
            ),
            carts: CartStore::new(kv),
            users: JsonFileUserRepository::new(config.users_path()),
            dashboard,
            orders: Mutex::new(orders),
        }
    }

    /// Order mutations are serialised through this lock.
    pub fn orders(&self) -> Result<MutexGuard<'_, Orders>, DomainError> {
        self.orders
            .lock()
            .map_err(|_| DomainError::Internal("order store lock poisoned".into()))
    }
}
