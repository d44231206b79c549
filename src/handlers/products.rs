use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::catalog::{CatalogQuery, SortOrder, DEFAULT_PAGE_SIZE};
use crate::domain::product::Product;
use crate::errors::AppError;
use crate::state::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub rating: f32,
    pub skin_type: String,
    pub category: String,
    /// Decimal price as a string, e.g. "18.90"
    pub price: String,
    pub stock: u32,
    pub image: String,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            rating: p.rating,
            skin_type: p.skin_type,
            category: p.category,
            price: p.price.to_string(),
            stock: p.stock,
            image: p.image,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListProductsResponse {
    pub items: Vec<ProductResponse>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListProductsParams {
    pub category: Option<String>,
    pub skin_type: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub q: Option<String>,
    /// featured | price_asc | price_desc | rating | name
    pub sort: Option<String>,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_page() -> usize {
    1
}

fn default_limit() -> usize {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpsertProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub skin_type: String,
    #[serde(default)]
    pub category: String,
    pub price: String,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub image: String,
}

fn parse_price(field: &str, raw: &str) -> Result<BigDecimal, AppError> {
    BigDecimal::from_str(raw.trim())
        .map_err(|e| AppError::BadRequest(format!("Invalid {field} '{raw}': {e}")))
}

impl ListProductsParams {
    fn into_query(self) -> Result<CatalogQuery, AppError> {
        let sort = match self.sort.as_deref() {
            None => SortOrder::default(),
            Some(s) => SortOrder::parse(s)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown sort '{s}'")))?,
        };
        Ok(CatalogQuery {
            category: self.category,
            skin_type: self.skin_type,
            min_price: self
                .min_price
                .map(|p| parse_price("minPrice", &p))
                .transpose()?,
            max_price: self
                .max_price
                .map(|p| parse_price("maxPrice", &p))
                .transpose()?,
            search: self.q.filter(|q| !q.trim().is_empty()),
            sort,
            page: self.page,
            page_size: self.limit,
        })
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /products
///
/// Fixture products merged with admin overrides, filtered, sorted and paged.
#[utoipa::path(
    get,
    path = "/products",
    params(
        ("category" = Option<String>, Query, description = "Exact category (case-insensitive)"),
        ("skinType" = Option<String>, Query, description = "Exact skin type (case-insensitive)"),
        ("minPrice" = Option<String>, Query, description = "Lowest price, inclusive"),
        ("maxPrice" = Option<String>, Query, description = "Highest price, inclusive"),
        ("q" = Option<String>, Query, description = "Text search over name and description"),
        ("sort" = Option<String>, Query, description = "featured | price_asc | price_desc | rating | name"),
        ("page" = Option<usize>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<usize>, Query, description = "Items per page (default 12, max 100)"),
    ),
    responses(
        (status = 200, description = "A page of products", body = ListProductsResponse),
        (status = 400, description = "Bad filter value"),
    ),
    tag = "products"
)]
pub async fn list_products(
    state: web::Data<AppState>,
    query: web::Query<ListProductsParams>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner().into_query()?;

    let page = web::block(move || state.catalog.query(&query))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ListProductsResponse {
        total: page.total,
        page: page.page,
        limit: page.page_size,
        items: page.items.into_iter().map(ProductResponse::from).collect(),
    }))
}

/// GET /products/{id}
#[utoipa::path(
    get,
    path = "/products/{id}",
    params(("id" = String, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found"),
    ),
    tag = "products"
)]
pub async fn get_product(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let lookup = id.clone();

    let product = web::block(move || state.catalog.find(&lookup))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    match product {
        Some(p) => Ok(HttpResponse::Ok().json(ProductResponse::from(p))),
        None => Err(AppError::NotFound(format!("Product {id}"))),
    }
}

/// PUT /products/{id}
///
/// Creates or replaces the admin override for a product.
#[utoipa::path(
    put,
    path = "/products/{id}",
    params(("id" = String, Path, description = "Product id")),
    request_body = UpsertProductRequest,
    responses(
        (status = 200, description = "Product saved", body = ProductResponse),
        (status = 400, description = "Product breaks an invariant"),
    ),
    tag = "products"
)]
pub async fn upsert_product(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpsertProductRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let product = Product {
        id: path.into_inner(),
        price: parse_price("price", &body.price)?,
        name: body.name,
        description: body.description,
        rating: body.rating,
        skin_type: body.skin_type,
        category: body.category,
        stock: body.stock,
        image: body.image,
    };

    let saved = web::block(move || state.catalog.upsert(product))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ProductResponse::from(saved)))
}
