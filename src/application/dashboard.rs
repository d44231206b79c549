use std::sync::{Arc, RwLock};

use bigdecimal::BigDecimal;
use serde::Serialize;

use crate::domain::events::OrderEvent;
use crate::domain::money::to_money;
use crate::domain::order::{Order, OrderStatus};
use crate::domain::ports::OrderRepository;

use super::order_store::OrderStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_orders: usize,
    pub in_progress: usize,
    pub delivered: usize,
    pub revenue: BigDecimal,
}

impl DashboardStats {
    pub fn from_orders(orders: &[Order]) -> Self {
        let in_progress = orders
            .iter()
            .filter(|o| o.status == OrderStatus::InProgress)
            .count();
        Self {
            total_orders: orders.len(),
            in_progress,
            delivered: orders.len() - in_progress,
            revenue: to_money(
                orders
                    .iter()
                    .fold(BigDecimal::from(0), |acc, o| acc + &o.total),
            ),
        }
    }
}

impl Default for DashboardStats {
    fn default() -> Self {
        Self::from_orders(&[])
    }
}

/// Admin counters kept current by listening to order changes.
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    stats: Arc<RwLock<DashboardStats>>,
}

impl Dashboard {
    pub fn attach<R: OrderRepository>(store: &mut OrderStore<R>) -> Self {
        let dashboard = Self {
            stats: Arc::new(RwLock::new(DashboardStats::from_orders(store.orders()))),
        };
        let stats = dashboard.stats.clone();
        store.subscribe(move |event| {
            if let OrderEvent::Changed { orders } = event {
                let fresh = DashboardStats::from_orders(orders);
                match stats.write() {
                    Ok(mut s) => *s = fresh,
                    Err(poisoned) => *poisoned.into_inner() = fresh,
                }
            }
        });
        dashboard
    }

    pub fn stats(&self) -> DashboardStats {
        match self.stats.read() {
            Ok(s) => s.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
