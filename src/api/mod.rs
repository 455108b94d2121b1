pub mod handlers;

pub use handlers::*;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;

use crate::db::PgInvoiceStore;
use crate::service::InvoiceIssuer;

/// 共享状态
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub issuer: Arc<InvoiceIssuer<PgInvoiceStore>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/users", post(create_user))
        .route("/api/branches", post(create_branch).get(list_branches))
        .route("/api/branches/:branch_id/invoices", get(list_invoices))
        .route("/api/categories", post(create_category))
        .route(
            "/api/purchase-transactions",
            post(create_purchase_transaction).get(list_purchase_transactions),
        )
        .route(
            "/api/purchase-transactions/bulk-create",
            post(bulk_create_purchase_transactions),
        )
        .route(
            "/api/purchase-transactions/bulk-delete",
            post(bulk_delete_purchase_transactions),
        )
        .route(
            "/api/purchase-transactions/:id",
            get(get_purchase_transaction).delete(delete_purchase_transaction),
        )
        .route("/api/invoices/purchase", post(issue_purchase_invoice))
        .route("/api/invoices/customer", post(create_customer_invoice))
        .with_state(state)
}
