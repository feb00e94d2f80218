// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! REST API surface for the ledger engine.
//!
//! ## Endpoints
//!
//! - `POST /api/admin/approve-recharge` - Approve a pending recharge
//! - `POST /api/admin/approve-withdraw` - Approve a pending withdrawal
//! - `POST /api/admin/reject` - Reject a pending request
//! - `POST /api/sync-profits` - Run one accrual pass
//! - `POST /api/register` - Register a user
//! - `POST /api/recharge` - File a recharge request
//! - `POST /api/withdraw` - File a withdraw request
//! - `POST /api/invest` - Buy an investment plan
//! - `GET  /api/users/{id}` - Fetch a user profile
//! - `GET  /api/users/{id}/transactions` - List a user's transactions
//! - `GET  /health` - Liveness probe
//!
//! ## Example Usage
//!
//! ```bash
//! curl -X POST http://localhost:3000/api/admin/approve-recharge \
//!   -H "Content-Type: application/json" \
//!   -d '{"transactionId": "t1", "adminUid": "admin-1"}'
//! ```

use crate::accrual::AccrualEngine;
use crate::approval::Approvals;
use crate::base::{ReferralCode, TxId, UserId};
use crate::clock::Clock;
use crate::error::LedgerError;
use crate::model::{Transaction, User};
use crate::requests::{NewUser, PlanOrder, RequestService};
use crate::store::LedgerStore;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

// === Request/Response DTOs ===

/// Body of the admin approval/rejection endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminActionRequest {
    pub transaction_id: String,
    pub admin_uid: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub phone: String,
    pub name: String,
    /// Sponsor's referral code, if the registrant was referred.
    pub referral_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RechargeRequest {
    pub user_id: String,
    pub amount: Decimal,
    pub payment_method: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    pub user_id: String,
    pub amount: Decimal,
    pub account_details: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductBody {
    pub product_id: String,
    pub product_name: String,
    pub price: Decimal,
    pub duration_days: i64,
    pub daily_profit: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestRequest {
    pub user_id: String,
    pub product: ProductBody,
}

/// Response body for errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// === Application State ===

/// Shared application state holding the injected services.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<LedgerStore>,
    pub approvals: Arc<Approvals>,
    pub engine: Arc<AccrualEngine>,
    pub requests: Arc<RequestService>,
}

impl AppState {
    /// Wires all services around one store and one clock.
    pub fn new(store: Arc<LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            approvals: Arc::new(Approvals::new(Arc::clone(&store), Arc::clone(&clock))),
            engine: Arc::new(AccrualEngine::new(Arc::clone(&store), Arc::clone(&clock))),
            requests: Arc::new(RequestService::new(Arc::clone(&store), clock)),
            store,
        }
    }
}

// === Error Handling ===

/// Wrapper for converting [`LedgerError`] into HTTP responses.
pub struct AppError(LedgerError);

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            LedgerError::Unauthorized => (StatusCode::FORBIDDEN, "UNAUTHORIZED"),
            LedgerError::InvalidState => (StatusCode::BAD_REQUEST, "INVALID_STATE"),
            LedgerError::UserNotFound => (StatusCode::NOT_FOUND, "USER_NOT_FOUND"),
            LedgerError::TransactionNotFound => (StatusCode::NOT_FOUND, "TRANSACTION_NOT_FOUND"),
            LedgerError::InvestmentNotFound => (StatusCode::NOT_FOUND, "INVESTMENT_NOT_FOUND"),
            LedgerError::Conflict => (StatusCode::CONFLICT, "CONFLICT"),
            LedgerError::InvalidAmount => (StatusCode::BAD_REQUEST, "INVALID_AMOUNT"),
            LedgerError::BelowMinimum => (StatusCode::BAD_REQUEST, "BELOW_MINIMUM"),
            LedgerError::InsufficientFunds => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_FUNDS")
            }
            LedgerError::DuplicateTransaction => (StatusCode::CONFLICT, "DUPLICATE_TRANSACTION"),
            LedgerError::DuplicateDocument => (StatusCode::CONFLICT, "DUPLICATE_DOCUMENT"),
            LedgerError::ReferralCodeTaken => (StatusCode::CONFLICT, "REFERRAL_CODE_TAKEN"),
            LedgerError::MalformedDocument => (StatusCode::BAD_REQUEST, "MALFORMED_DOCUMENT"),
            LedgerError::StoreUnavailable => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORE_UNAVAILABLE")
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

// === Handlers ===

/// POST /api/admin/approve-recharge
async fn approve_recharge(
    State(state): State<AppState>,
    Json(req): Json<AdminActionRequest>,
) -> Result<Json<Value>, AppError> {
    state.approvals.approve_recharge(
        &TxId(req.transaction_id),
        &UserId(req.admin_uid),
    )?;
    Ok(Json(json!({ "success": true })))
}

/// POST /api/admin/approve-withdraw
async fn approve_withdraw(
    State(state): State<AppState>,
    Json(req): Json<AdminActionRequest>,
) -> Result<Json<Value>, AppError> {
    state.approvals.approve_withdraw(
        &TxId(req.transaction_id),
        &UserId(req.admin_uid),
    )?;
    Ok(Json(json!({ "success": true })))
}

/// POST /api/admin/reject
async fn reject(
    State(state): State<AppState>,
    Json(req): Json<AdminActionRequest>,
) -> Result<Json<Value>, AppError> {
    state
        .approvals
        .reject(&TxId(req.transaction_id), &UserId(req.admin_uid))?;
    Ok(Json(json!({ "success": true })))
}

/// POST /api/sync-profits - run one accrual pass.
///
/// Per-investment failures never fail the pass; they are reported in the
/// summary.
async fn sync_profits(State(state): State<AppState>) -> Json<Value> {
    let summary = state.engine.run_pass();
    Json(json!({
        "success": true,
        "scanned": summary.scanned,
        "skipped": summary.skipped,
        "credited": summary.credited,
        "completed": summary.completed,
        "commissions": summary.commissions,
        "failures": summary.failures.len(),
    }))
}

/// POST /api/register
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = state.requests.register(NewUser {
        phone: req.phone,
        name: req.name,
        referred_by: req.referral_code.map(ReferralCode),
    })?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/recharge
async fn recharge(
    State(state): State<AppState>,
    Json(req): Json<RechargeRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let tx_id = state.requests.request_recharge(
        &UserId(req.user_id),
        req.amount,
        req.payment_method,
    )?;
    Ok((StatusCode::CREATED, Json(json!({ "transactionId": tx_id }))))
}

/// POST /api/withdraw
async fn withdraw(
    State(state): State<AppState>,
    Json(req): Json<WithdrawRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let tx_id = state.requests.request_withdraw(
        &UserId(req.user_id),
        req.amount,
        req.account_details,
    )?;
    Ok((StatusCode::CREATED, Json(json!({ "transactionId": tx_id }))))
}

/// POST /api/invest
async fn invest(
    State(state): State<AppState>,
    Json(req): Json<InvestRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let order = PlanOrder {
        product_id: req.product.product_id,
        product_name: req.product.product_name,
        price: req.product.price,
        duration_days: req.product.duration_days,
        daily_profit: req.product.daily_profit,
    };
    let inv_id = state
        .requests
        .purchase_plan(&UserId(req.user_id), &order)?;
    Ok((StatusCode::CREATED, Json(json!({ "investmentId": inv_id }))))
}

/// GET /api/users/{id}
async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    state
        .store
        .get_user(&UserId(id))
        .map(Json)
        .ok_or(AppError(LedgerError::UserNotFound))
}

/// GET /api/users/{id}/transactions - newest first.
async fn list_user_transactions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    let user_id = UserId(id);
    if state.store.get_user(&user_id).is_none() {
        return Err(AppError(LedgerError::UserNotFound));
    }
    Ok(Json(state.store.transactions_for_user(&user_id)))
}

// === Router ===

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/admin/approve-recharge", post(approve_recharge))
        .route("/api/admin/approve-withdraw", post(approve_withdraw))
        .route("/api/admin/reject", post(reject))
        .route("/api/sync-profits", post(sync_profits))
        .route("/api/register", post(register))
        .route("/api/recharge", post(recharge))
        .route("/api/withdraw", post(withdraw))
        .route("/api/invest", post(invest))
        .route("/api/users/{id}", get(get_user))
        .route("/api/users/{id}/transactions", get(list_user_transactions))
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
