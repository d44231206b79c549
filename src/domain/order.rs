use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cart::CartItem;
use super::money::line_sum;

pub const ORDER_CODE_PREFIX: &str = "SB";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "en proceso")]
    InProgress,
    #[serde(rename = "entregado")]
    Delivered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::InProgress => "en proceso",
            OrderStatus::Delivered => "entregado",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "en proceso" => Some(OrderStatus::InProgress),
            "entregado" => Some(OrderStatus::Delivered),
            _ => None,
        }
    }

    /// No transition leaves a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A purchased line, copied from the cart at confirmation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: String,
    pub name: String,
    pub price: BigDecimal,
    pub quantity: u32,
}

impl From<&CartItem> for OrderLine {
    fn from(item: &CartItem) -> Self {
        OrderLine {
            id: item.id.clone(),
            name: item.name.clone(),
            price: item.price.clone(),
            quantity: item.quantity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDescriptor {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last4: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub code: String,
    pub user_id: String,
    pub user_name: String,
    pub items: Vec<OrderLine>,
    pub total: BigDecimal,
    pub status: OrderStatus,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub shipping_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentDescriptor>,
}

/// Everything needed to create an order apart from the generated fields.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: String,
    pub user_name: String,
    pub items: Vec<OrderLine>,
    pub shipping_address: String,
    pub payment_method: PaymentDescriptor,
}

impl Order {
    /// Builds an in-progress order. The total is fixed here and never
    /// recomputed afterwards.
    pub fn create(new: NewOrder, now: DateTime<Utc>) -> Self {
        let total = line_sum(new.items.iter().map(|l| (&l.price, l.quantity)));
        Order {
            id: next_order_id(now),
            code: order_code(now),
            user_id: new.user_id,
            user_name: new.user_name,
            items: new.items,
            total,
            status: OrderStatus::InProgress,
            date: now,
            shipping_address: new.shipping_address,
            payment_method: Some(new.payment_method),
        }
    }
}

static LAST_ORDER_ID: AtomicI64 = AtomicI64::new(0);

/// Millisecond timestamp, bumped when needed so ids strictly increase within
/// the process even when two orders share a millisecond.
pub fn next_order_id(now: DateTime<Utc>) -> String {
    let candidate = now.timestamp_millis();
    let mut last = LAST_ORDER_ID.load(Ordering::Relaxed);
    loop {
        let next = candidate.max(last + 1);
        match LAST_ORDER_ID.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed)
        {
            Ok(_) => return next.to_string(),
            Err(actual) => last = actual,
        }
    }
}

const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn to_base36(mut n: u128) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

/// `SB-<base36 millis>-<4 random base36 chars>`.
pub fn order_code(now: DateTime<Utc>) -> String {
    let stamp = to_base36(u128::try_from(now.timestamp_millis()).unwrap_or(0));
    let random = Uuid::new_v4().as_u128() % 36u128.pow(4);
    format!("{ORDER_CODE_PREFIX}-{stamp}-{:0>4}", to_base36(random))
}
