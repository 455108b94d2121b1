use crate::api::AppState;
use crate::db::queries;
use crate::error::{AppError, Entity};
use crate::models::{
    validate_batch, BulkDeleteRequest, CustomerInvoiceRequest, InvoiceLedger, IssuedLine,
    LineItemFilter, NewBranch, NewCategory, NewLineItem, PurchaseInvoiceRequest,
};
use axum::{
    extract::{Json, Path, Query, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 错误响应体
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error_code: &'static str,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        let body = ErrorResponse {
            success: false,
            error_code: self.error_code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// 成功响应体
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

fn ok<T: Serialize>(status: StatusCode, data: T) -> Response {
    (status, Json(DataResponse { success: true, data })).into_response()
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
pub struct NewUserRequest {
    pub email: String,
    pub name: Option<String>,
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<NewUserRequest>,
) -> Result<Response, AppError> {
    if !req.email.contains('@') {
        return Err(AppError::InvalidInput("Invalid email".to_string()));
    }
    let user = queries::create_user(&state.pool, req.email.trim(), req.name.as_deref()).await?;
    Ok(ok(StatusCode::CREATED, user))
}

pub async fn create_branch(
    State(state): State<AppState>,
    Json(req): Json<NewBranch>,
) -> Result<Response, AppError> {
    req.validate().map_err(AppError::InvalidInput)?;
    let branch = queries::create_branch(&state.pool, &req).await?;
    Ok(ok(StatusCode::CREATED, branch))
}

#[derive(Debug, Deserialize)]
pub struct BranchQuery {
    pub user_id: Uuid,
}

pub async fn list_branches(
    State(state): State<AppState>,
    Query(query): Query<BranchQuery>,
) -> Result<Response, AppError> {
    let branches = queries::list_branches(&state.pool, query.user_id).await?;
    Ok(ok(StatusCode::OK, branches))
}

/// 分店计数器 + 已开具发票
pub async fn list_invoices(
    State(state): State<AppState>,
    Path(branch_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let counter = queries::get_invoice_counter(&state.pool, branch_id)
        .await?
        .ok_or(AppError::NotFound(Entity::InvoiceCounter))?;
    let invoice_items = queries::list_invoice_items(&state.pool, branch_id).await?;
    Ok(ok(
        StatusCode::OK,
        InvoiceLedger {
            counter,
            invoice_items,
        },
    ))
}

pub async fn create_category(
    State(state): State<AppState>,
    Json(req): Json<NewCategory>,
) -> Result<Response, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::InvalidInput("Category name is required".to_string()));
    }
    let category = queries::create_category(&state.pool, &req).await?;
    Ok(ok(StatusCode::CREATED, category))
}

pub async fn create_purchase_transaction(
    State(state): State<AppState>,
    Json(req): Json<NewLineItem>,
) -> Result<Response, AppError> {
    req.validate().map_err(AppError::InvalidInput)?;
    let line_item = queries::create_line_item(&state.pool, &req).await?;
    Ok(ok(StatusCode::CREATED, line_item))
}

pub async fn list_purchase_transactions(
    State(state): State<AppState>,
    Query(filter): Query<LineItemFilter>,
) -> Result<Response, AppError> {
    let (start, end) = filter.date_range(Utc::now()).map_err(AppError::InvalidInput)?;
    let items =
        queries::list_line_items(&state.pool, filter.user_id, filter.category_id, start, end)
            .await?;
    Ok(ok(StatusCode::OK, items))
}

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub user_id: Uuid,
}

pub async fn get_purchase_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(owner): Query<OwnerQuery>,
) -> Result<Response, AppError> {
    let item = queries::get_line_item(&state.pool, owner.user_id, id)
        .await?
        .ok_or(AppError::NotFound(Entity::PurchaseTransaction))?;
    Ok(ok(StatusCode::OK, item))
}

pub async fn bulk_create_purchase_transactions(
    State(state): State<AppState>,
    Json(items): Json<Vec<NewLineItem>>,
) -> Result<Response, AppError> {
    validate_batch(&items).map_err(AppError::InvalidInput)?;
    let created = queries::create_line_items(&state.pool, &items).await?;
    Ok(ok(StatusCode::CREATED, created))
}

pub async fn delete_purchase_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(owner): Query<OwnerQuery>,
) -> Result<Response, AppError> {
    let deleted = queries::delete_line_items(&state.pool, owner.user_id, &[id]).await?;
    let item = deleted
        .into_iter()
        .next()
        .ok_or(AppError::NotFound(Entity::PurchaseTransaction))?;
    Ok(ok(StatusCode::OK, item))
}

pub async fn bulk_delete_purchase_transactions(
    State(state): State<AppState>,
    Json(req): Json<BulkDeleteRequest>,
) -> Result<Response, AppError> {
    if req.ids.is_empty() {
        return Err(AppError::InvalidInput("At least one id is required".to_string()));
    }
    let deleted = queries::delete_line_items(&state.pool, req.user_id, &req.ids).await?;
    Ok(ok(StatusCode::OK, deleted))
}

/// 采购发票: 返回 PDF, 发票号和明细放在响应头
pub async fn issue_purchase_invoice(
    State(state): State<AppState>,
    Json(req): Json<PurchaseInvoiceRequest>,
) -> Result<Response, AppError> {
    let issued = state.issuer.issue_purchase_invoice(&req).await?;

    let mut response = pdf_response(issued.document, &issued.filename)?;
    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static("x-invoice-number"),
        HeaderValue::from(issued.invoice.invoice_number),
    );
    headers.insert(
        HeaderName::from_static("x-invoice-lines"),
        lines_header(&issued.lines)?,
    );
    Ok(response)
}

pub async fn create_customer_invoice(
    State(state): State<AppState>,
    Json(req): Json<CustomerInvoiceRequest>,
) -> Result<Response, AppError> {
    let rendered = state.issuer.render_customer_invoice(&req).await?;
    pdf_response(rendered.bytes, &rendered.filename)
}

fn pdf_response(bytes: Vec<u8>, filename: &str) -> Result<Response, AppError> {
    let disposition = HeaderValue::from_str(&format!("attachment; filename={}", filename))
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// 选中明细的 JSON 摘要 (line_item_id, quantity, total)
fn lines_header(lines: &[IssuedLine]) -> Result<HeaderValue, AppError> {
    let summary: Vec<_> = lines
        .iter()
        .map(|line| {
            serde_json::json!({
                "line_item_id": line.line_item_id,
                "quantity": line.quantity,
                "total": line.total.to_string(),
            })
        })
        .collect();
    let text = serde_json::to_string(&summary).map_err(|e| AppError::Internal(e.to_string()))?;
    HeaderValue::from_str(&text).map_err(|e| AppError::Internal(e.to_string()))
}
