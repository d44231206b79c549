use std::cmp::Ordering;
use std::collections::HashSet;

use bigdecimal::BigDecimal;

use super::product::Product;

pub const DEFAULT_PAGE_SIZE: usize = 12;
pub const MAX_PAGE_SIZE: usize = 100;

/// Two-tier read: every override, then fixture products whose id is not
/// overridden. Overrides keep their own order; so does the fixture.
pub fn merge(overrides: Vec<Product>, fixture: Vec<Product>) -> Vec<Product> {
    let overridden: HashSet<String> = overrides.iter().map(|p| p.id.clone()).collect();
    let mut merged = overrides;
    merged.extend(fixture.into_iter().filter(|p| !overridden.contains(&p.id)));
    merged
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Featured,
    PriceAsc,
    PriceDesc,
    RatingDesc,
    NameAsc,
}

impl SortOrder {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "featured" => Some(SortOrder::Featured),
            "price_asc" => Some(SortOrder::PriceAsc),
            "price_desc" => Some(SortOrder::PriceDesc),
            "rating" => Some(SortOrder::RatingDesc),
            "name" => Some(SortOrder::NameAsc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CatalogQuery {
    pub category: Option<String>,
    pub skin_type: Option<String>,
    pub min_price: Option<BigDecimal>,
    pub max_price: Option<BigDecimal>,
    pub search: Option<String>,
    pub sort: SortOrder,
    pub page: usize,
    pub page_size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogPage {
    pub items: Vec<Product>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

impl CatalogQuery {
    fn matches(&self, p: &Product) -> bool {
        if let Some(category) = &self.category {
            if !p.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if let Some(skin) = &self.skin_type {
            if !p.skin_type.eq_ignore_ascii_case(skin) {
                return false;
            }
        }
        if self.min_price.as_ref().is_some_and(|min| &p.price < min) {
            return false;
        }
        if self.max_price.as_ref().is_some_and(|max| &p.price > max) {
            return false;
        }
        if let Some(needle) = &self.search {
            let needle = needle.to_lowercase();
            if !p.name.to_lowercase().contains(&needle)
                && !p.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }

    /// Filter, sort, then cut out one page. Page numbers are 1-based.
    pub fn run(&self, products: Vec<Product>) -> CatalogPage {
        let page = self.page.max(1);
        let page_size = if self.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.page_size.min(MAX_PAGE_SIZE)
        };

        let mut hits: Vec<Product> = products.into_iter().filter(|p| self.matches(p)).collect();
        match self.sort {
            SortOrder::Featured => {}
            SortOrder::PriceAsc => hits.sort_by(|a, b| a.price.cmp(&b.price)),
            SortOrder::PriceDesc => hits.sort_by(|a, b| b.price.cmp(&a.price)),
            SortOrder::RatingDesc => hits.sort_by(|a, b| {
                b.rating.partial_cmp(&a.rating).unwrap_or(Ordering::Equal)
            }),
            SortOrder::NameAsc => hits.sort_by_key(|p| p.name.to_lowercase()),
        }

        let total = hits.len();
        let items = hits
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .collect();

        CatalogPage {
            items,
            total,
            page,
            page_size,
        }
    }
}
