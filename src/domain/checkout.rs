//! Checkout: Shipping → Payment → Review → Confirmation.
//!
//! The flow works on a copy of the cart taken when it begins. Validation
//! failures keep the current step and record per-field messages; a failed
//! order write keeps the flow in Review with the cart intact.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::cart::{Cart, CartItem};
use super::errors::{DomainError, FieldErrors};
use super::order::{NewOrder, Order, OrderLine, PaymentDescriptor};
use super::ports::{OrderPlacer, UserRepository};
use super::user::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutStep {
    Shipping,
    Payment,
    Review,
    Confirmation,
}

impl CheckoutStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStep::Shipping => "shipping",
            CheckoutStep::Payment => "payment",
            CheckoutStep::Review => "review",
            CheckoutStep::Confirmation => "confirmation",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ShippingDetails {
    pub name: String,
    pub email: String,
    pub address: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    #[default]
    Card,
    Paypal,
    CashOnDelivery,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentKind::Card => "card",
            PaymentKind::Paypal => "paypal",
            PaymentKind::CashOnDelivery => "cash_on_delivery",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    #[serde(default)]
    pub method: PaymentKind,
    #[serde(default)]
    pub card_number: String,
    #[serde(default)]
    pub card_holder: String,
    /// `MM/YY`
    #[serde(default)]
    pub expiry: String,
}

impl PaymentDetails {
    /// What gets stored on the order: never the full number.
    pub fn descriptor(&self) -> PaymentDescriptor {
        match self.method {
            PaymentKind::Card => {
                let digits = card_digits(&self.card_number);
                let last4 = digits.get(digits.len().saturating_sub(4)..).map(str::to_string);
                PaymentDescriptor {
                    method: PaymentKind::Card.as_str().to_string(),
                    brand: Some(card_brand(&digits).to_string()),
                    last4,
                }
            }
            other => PaymentDescriptor {
                method: other.as_str().to_string(),
                brand: None,
                last4: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub order_id: String,
    pub code: String,
    pub total: BigDecimal,
}

pub fn validate_shipping(details: &ShippingDetails) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if details.name.trim().is_empty() {
        errors.insert("name", "Name is required".to_string());
    }
    if details.email.trim().is_empty() {
        errors.insert("email", "Email is required".to_string());
    }
    if details.address.trim().is_empty() {
        errors.insert("address", "Address is required".to_string());
    }
    errors
}

fn card_digits(number: &str) -> String {
    number.chars().filter(|c| *c != ' ' && *c != '-').collect()
}

fn card_brand(digits: &str) -> &'static str {
    let prefix2: u32 = digits.get(..2).and_then(|p| p.parse().ok()).unwrap_or(0);
    let prefix4: u32 = digits.get(..4).and_then(|p| p.parse().ok()).unwrap_or(0);
    if digits.starts_with('4') {
        "visa"
    } else if (51..=55).contains(&prefix2) || (2221..=2720).contains(&prefix4) {
        "mastercard"
    } else if prefix2 == 34 || prefix2 == 37 {
        "amex"
    } else {
        "card"
    }
}

/// Parses `MM/YY` into (year, month).
fn parse_expiry(expiry: &str) -> Option<(i32, u32)> {
    let (mm, yy) = expiry.trim().split_once('/')?;
    let two_digits = |s: &str| s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit());
    if !two_digits(mm) || !two_digits(yy) {
        return None;
    }
    let month: u32 = mm.parse().ok()?;
    let year: i32 = yy.parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some((2000 + year, month))
}

/// Card checks only apply when paying by card.
pub fn validate_payment(details: &PaymentDetails, today: NaiveDate) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if details.method != PaymentKind::Card {
        return errors;
    }

    let digits = card_digits(&details.card_number);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        errors.insert("cardNumber", "Card number must contain only digits".to_string());
    } else if !(13..=19).contains(&digits.len()) {
        errors.insert("cardNumber", "Card number must have 13 to 19 digits".to_string());
    }

    let holder = details.card_holder.trim();
    if holder.is_empty() || !holder.chars().all(|c| c.is_alphabetic() || c.is_whitespace()) {
        errors.insert("cardHolder", "Card holder may only contain letters".to_string());
    }

    match parse_expiry(&details.expiry) {
        None => {
            errors.insert("expiry", "Expiry must be MM/YY".to_string());
        }
        Some((year, month)) if (year, month) < (today.year(), today.month()) => {
            errors.insert("expiry", "Card has expired".to_string());
        }
        Some(_) => {}
    }
    errors
}

#[derive(Debug, Clone)]
pub struct CheckoutFlow {
    step: CheckoutStep,
    items: Vec<CartItem>,
    total: BigDecimal,
    shipping: ShippingDetails,
    payment: PaymentDetails,
    errors: FieldErrors,
    confirmation: Option<Confirmation>,
}

impl CheckoutFlow {
    /// Starts from a copy of the cart. An empty cart sends the shopper back to
    /// the catalog instead.
    pub fn begin(cart: &Cart) -> Result<Self, DomainError> {
        if cart.is_empty() {
            return Err(DomainError::EmptyCart);
        }
        Ok(Self {
            step: CheckoutStep::Shipping,
            items: cart.items().to_vec(),
            total: cart.total_price(),
            shipping: ShippingDetails::default(),
            payment: PaymentDetails::default(),
            errors: FieldErrors::new(),
            confirmation: None,
        })
    }

    pub fn step(&self) -> CheckoutStep {
        self.step
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn total(&self) -> &BigDecimal {
        &self.total
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn confirmation(&self) -> Option<&Confirmation> {
        self.confirmation.as_ref()
    }

    /// The empty pseudo-state: nothing to buy and not yet confirmed.
    pub fn should_redirect(&self, cart: &Cart) -> bool {
        cart.is_empty() && self.step != CheckoutStep::Confirmation
    }

    pub fn set_shipping(&mut self, details: ShippingDetails) {
        self.shipping = details;
    }

    pub fn set_payment(&mut self, details: PaymentDetails) {
        self.payment = details;
    }

    fn expect_step(&self, expected: CheckoutStep) -> Result<(), DomainError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(DomainError::WrongStep {
                expected: expected.as_str(),
                actual: self.step.as_str(),
            })
        }
    }

    fn reject(&mut self, errors: FieldErrors) -> Result<(), DomainError> {
        self.errors = errors.clone();
        Err(DomainError::Validation(errors))
    }

    /// Shipping → Payment. Also writes the address onto the signed-in user's
    /// profile.
    pub fn submit_shipping(
        &mut self,
        users: &dyn UserRepository,
        user_id: Option<&str>,
    ) -> Result<(), DomainError> {
        self.expect_step(CheckoutStep::Shipping)?;
        let errors = validate_shipping(&self.shipping);
        if !errors.is_empty() {
            return self.reject(errors);
        }
        if let Some(id) = user_id {
            users.save_address(id, self.shipping.address.trim())?;
        }
        self.errors.clear();
        self.step = CheckoutStep::Payment;
        Ok(())
    }

    /// Payment → Review; every failing field is reported at once.
    pub fn submit_payment(&mut self, today: NaiveDate) -> Result<(), DomainError> {
        self.expect_step(CheckoutStep::Payment)?;
        let errors = validate_payment(&self.payment, today);
        if !errors.is_empty() {
            return self.reject(errors);
        }
        self.errors.clear();
        self.step = CheckoutStep::Review;
        Ok(())
    }

    /// Payment → Shipping or Review → Payment, keeping what was typed.
    pub fn back(&mut self) -> Result<(), DomainError> {
        self.step = match self.step {
            CheckoutStep::Payment => CheckoutStep::Shipping,
            CheckoutStep::Review => CheckoutStep::Payment,
            other => {
                return Err(DomainError::WrongStep {
                    expected: "payment or review",
                    actual: other.as_str(),
                })
            }
        };
        self.errors.clear();
        Ok(())
    }

    /// Review → Confirmation. Nothing is mutated unless the order is stored.
    pub fn confirm<P>(
        &mut self,
        user: Option<&User>,
        cart: &mut Cart,
        orders: &mut P,
        now: DateTime<Utc>,
    ) -> Result<Confirmation, DomainError>
    where
        P: OrderPlacer + ?Sized,
    {
        self.expect_step(CheckoutStep::Review)?;
        let user = user.ok_or(DomainError::Unauthenticated)?;

        let order = Order::create(
            NewOrder {
                user_id: user.id.clone(),
                user_name: user.name.clone(),
                items: self.items.iter().map(OrderLine::from).collect(),
                shipping_address: self.shipping.address.trim().to_string(),
                payment_method: self.payment.descriptor(),
            },
            now,
        );
        let confirmation = Confirmation {
            order_id: order.id.clone(),
            code: order.code.clone(),
            total: order.total.clone(),
        };

        if let Err(e) = orders.place_order(order) {
            log::error!("Failed to place order {}: {}", confirmation.code, e);
            return Err(e);
        }

        cart.clear();
        self.step = CheckoutStep::Confirmation;
        self.confirmation = Some(confirmation.clone());
        Ok(confirmation)
    }

    /// Leaves the finished flow; a new order needs a new `begin`.
    pub fn return_to_shopping(self) -> Option<Confirmation> {
        self.confirmation
    }
}
