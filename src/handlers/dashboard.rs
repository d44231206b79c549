use actix_web::{web, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub total_orders: usize,
    pub in_progress: usize,
    pub delivered: usize,
    pub revenue: String,
}

/// GET /dashboard
///
/// Order counters for the admin home page.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses((status = 200, description = "Order counters", body = DashboardResponse)),
    tag = "admin"
)]
pub async fn get_dashboard(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let stats = web::block(move || {
        // Loading publishes a change if the list moved, which refreshes the counters.
        state.orders()?.load_orders()?;
        Ok::<_, AppError>(state.dashboard.stats())
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(DashboardResponse {
        total_orders: stats.total_orders,
        in_progress: stats.in_progress,
        delivered: stats.delivered,
        revenue: stats.revenue.to_string(),
    }))
}
