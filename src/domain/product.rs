use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use super::errors::DomainError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub skin_type: String,
    #[serde(default)]
    pub category: String,
    pub price: BigDecimal,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub image: String,
}

impl Product {
    /// Checks the invariants an admin edit must respect.
    ///
    /// Stock is unsigned, so only rating and price need a runtime check.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id.trim().is_empty() {
            return Err(DomainError::InvalidInput("product id is empty".into()));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidInput("product name is empty".into()));
        }
        if !(0.0..=5.0).contains(&self.rating) {
            return Err(DomainError::InvalidInput(format!(
                "rating {} is outside 0..=5",
                self.rating
            )));
        }
        if self.price < BigDecimal::from(0) {
            return Err(DomainError::InvalidInput(format!(
                "price {} is negative",
                self.price
            )));
        }
        Ok(())
    }

    /// The slice of a product the cart needs.
    pub fn to_ref(&self) -> ProductRef {
        ProductRef {
            id: self.id.clone(),
            name: self.name.clone(),
            price: self.price.clone(),
            image: self.image.clone(),
        }
    }
}

/// What "add to cart" receives: enough to render a line, nothing live.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRef {
    pub id: String,
    pub name: String,
    pub price: BigDecimal,
    pub image: String,
}

#[cfg(test)]
pub(crate) fn sample(id: &str, price: &str) -> Product {
    use std::str::FromStr;

    Product {
        id: id.to_string(),
        name: format!("Product {id}"),
        description: String::new(),
        rating: 4.0,
        skin_type: "all".to_string(),
        category: "skincare".to_string(),
        price: BigDecimal::from_str(price).expect("valid decimal"),
        stock: 10,
        image: format!("/img/{id}.jpg"),
    }
}
