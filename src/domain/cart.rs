use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use super::events::{CartEvent, EventBus, SubscriptionId};
use super::money::{line_sum, to_money};
use super::product::ProductRef;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub name: String,
    pub price: BigDecimal,
    #[serde(default)]
    pub image: String,
    pub quantity: u32,
}

impl CartItem {
    pub fn line_total(&self) -> BigDecimal {
        to_money(&self.price * &BigDecimal::from(self.quantity))
    }
}

/// Items a shopper intends to buy, one entry per product id.
///
/// Quantities are always at least one; totals are derived on read.
#[derive(Debug, Default)]
pub struct Cart {
    items: Vec<CartItem>,
    events: EventBus<CartEvent>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a cart from persisted items, dropping anything with a zero
    /// quantity and folding duplicate ids together.
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let mut cart = Self::new();
        for item in items.into_iter().filter(|i| i.quantity > 0) {
            match cart.items.iter_mut().find(|i| i.id == item.id) {
                Some(existing) => existing.quantity += item.quantity,
                None => cart.items.push(item),
            }
        }
        cart
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&CartEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(listener)
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_items(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn total_price(&self) -> BigDecimal {
        line_sum(self.items.iter().map(|i| (&i.price, i.quantity)))
    }

    pub fn add_item(&mut self, product: ProductRef) {
        let (name, quantity) = match self.items.iter_mut().find(|i| i.id == product.id) {
            Some(existing) => {
                existing.quantity += 1;
                (existing.name.clone(), existing.quantity)
            }
            None => {
                let name = product.name.clone();
                self.items.push(CartItem {
                    id: product.id,
                    name: product.name,
                    price: product.price,
                    image: product.image,
                    quantity: 1,
                });
                (name, 1)
            }
        };
        self.events.publish(&CartEvent::ItemAdded { name, quantity });
    }

    pub fn remove_item(&mut self, id: &str) {
        if let Some(pos) = self.items.iter().position(|i| i.id == id) {
            let removed = self.items.remove(pos);
            self.events
                .publish(&CartEvent::ItemRemoved { name: removed.name });
        }
    }

    /// Non-positive quantities remove the line. Stock is not consulted.
    pub fn update_quantity(&mut self, id: &str, quantity: i64) {
        if quantity <= 0 {
            self.remove_item(id);
            return;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        if let Some(item) = self.items.iter_mut().find(|i| i.id == id) {
            item.quantity = quantity;
            let event = CartEvent::QuantityChanged {
                name: item.name.clone(),
                quantity,
            };
            self.events.publish(&event);
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.events.publish(&CartEvent::Cleared);
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::{Arc, Mutex};

    use super::*;

    fn product(id: &str, price: &str) -> ProductRef {
        ProductRef {
            id: id.to_string(),
            name: format!("Item {id}"),
            price: BigDecimal::from_str(price).unwrap(),
            image: String::new(),
        }
    }

    fn recording(cart: &mut Cart) -> Arc<Mutex<Vec<CartEvent>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        cart.subscribe(move |e| sink.lock().unwrap().push(e.clone()));
        log
    }

    #[test]
    fn adding_same_product_n_times_yields_one_line() {
        let mut cart = Cart::new();
        for _ in 0..5 {
            cart.add_item(product("a", "3.00"));
        }
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 5);
        assert_eq!(cart.total_items(), 5);
    }

    #[test]
    fn adding_existing_item_doubles_total() {
        let mut cart = Cart::new();
        cart.add_item(product("7", "20.00"));
        cart.add_item(product("7", "20.00"));

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
        assert_eq!(cart.total_price(), BigDecimal::from_str("40.00").unwrap());
    }

    #[test]
    fn single_unit_total_keeps_cents() {
        let mut cart = Cart::new();
        cart.add_item(product("7", "20.00"));
        assert_eq!(cart.items()[0].line_total().to_string(), "20.00");
        assert_eq!(cart.total_price().to_string(), "20.00");

        cart.add_item(product("7", "20.00"));
        assert_eq!(cart.total_price().to_string(), "40.00");
    }

    #[test]
    fn empty_cart_totals_zero() {
        assert_eq!(Cart::new().total_price().to_string(), "0.00");
    }

    #[test]
    fn non_positive_quantity_removes_the_line() {
        let mut cart = Cart::new();
        cart.add_item(product("a", "1.00"));
        cart.add_item(product("b", "1.00"));

        cart.update_quantity("a", 0);
        cart.update_quantity("b", -3);

        assert!(cart.is_empty());
    }

    #[test]
    fn update_quantity_has_no_upper_bound() {
        let mut cart = Cart::new();
        cart.add_item(product("a", "2.50"));
        cart.update_quantity("a", 1000);
        assert_eq!(cart.total_items(), 1000);
        assert_eq!(cart.total_price(), BigDecimal::from(2500));
    }

    #[test]
    fn totals_track_every_mutation() {
        let mut cart = Cart::new();
        cart.add_item(product("a", "1.25"));
        cart.add_item(product("b", "4.00"));
        cart.update_quantity("b", 3);
        cart.add_item(product("a", "1.25"));
        cart.remove_item("missing");

        let expected_price = cart
            .items()
            .iter()
            .fold(BigDecimal::from(0), |acc, i| acc + &i.price * &BigDecimal::from(i.quantity));
        assert_eq!(cart.total_price(), expected_price);
        assert_eq!(cart.total_price(), BigDecimal::from_str("14.50").unwrap());
        assert_eq!(cart.total_items(), 5);
    }

    #[test]
    fn events_name_the_item_and_quantity() {
        let mut cart = Cart::new();
        let log = recording(&mut cart);

        cart.add_item(product("a", "1.00"));
        cart.add_item(product("a", "1.00"));
        cart.remove_item("a");
        cart.remove_item("a");
        cart.clear();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                CartEvent::ItemAdded { name: "Item a".into(), quantity: 1 },
                CartEvent::ItemAdded { name: "Item a".into(), quantity: 2 },
                CartEvent::ItemRemoved { name: "Item a".into() },
                CartEvent::Cleared,
            ]
        );
    }

    #[test]
    fn from_items_folds_duplicates_and_drops_zeroes() {
        let line = |id: &str, quantity| CartItem {
            id: id.to_string(),
            name: id.to_string(),
            price: BigDecimal::from(1),
            image: String::new(),
            quantity,
        };
        let cart = Cart::from_items(vec![line("a", 1), line("b", 0), line("a", 2)]);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.total_items(), 3);
    }
}
