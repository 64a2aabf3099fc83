//! HTTP handlers.
//!
//! ```text
//! GET  /                    - Health message
//! GET  /api/auth/cart       - Stored cart of the bearer's user
//! POST /api/auth/cart       - Merge an item into that cart
//! GET  /api/currency/rates  - Exchange rates from the upstream service
//! GET  /api/currency/convert - Convert an amount between two currencies
//! ```

use axum::{
    Json,
    extract::{FromRequestParts, Query, State, rejection::JsonRejection},
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::instrument;

use super::AppState;
use super::cart::{self, AddToCart};
use super::error::ApiError;
use super::user::ServerCartItem;
use crate::core::currency::{BASE_CURRENCY, Currency, RateTable};
use crate::core::price;

/// Decimal places kept for derived rates.
const RATE_DP: u32 = 6;

/// The user id a bearer token resolved to.
pub struct AuthUser(pub String);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split_whitespace().nth(1))
            .ok_or(ApiError::MissingToken)?;

        state
            .tokens
            .get(token)
            .cloned()
            .map(Self)
            .ok_or(ApiError::InvalidToken)
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({ "message": "E-commerce API is running!" }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartBody {
    #[serde(default)]
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub size: Option<String>,
}

fn default_quantity() -> u32 {
    1
}

#[instrument(skip_all, fields(user = %user_id))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    body: Result<Json<AddToCartBody>, JsonRejection>,
) -> Result<Json<Vec<ServerCartItem>>, ApiError> {
    let Json(body) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let item = AddToCart {
        product_id: body.product_id,
        quantity: body.quantity,
        size: body.size,
    };
    let cart = cart::add_to_server_cart(state.users.as_ref(), &user_id, item).await?;
    Ok(Json(cart))
}

#[instrument(skip_all, fields(user = %user_id))]
pub async fn get_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<ServerCartItem>>, ApiError> {
    let cart = cart::server_cart(state.users.as_ref(), &user_id).await?;
    Ok(Json(cart))
}

#[derive(Debug, Deserialize)]
pub struct RatesQuery {
    pub base: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RatesBody {
    pub success: bool,
    pub base: &'static str,
    pub rates: BTreeMap<&'static str, f64>,
    pub date: String,
}

/// Unlike the client-side rate source this does not fall back; callers get
/// an error and decide for themselves.
pub async fn rates(
    State(state): State<AppState>,
    Query(query): Query<RatesQuery>,
) -> Result<Json<RatesBody>, ApiError> {
    let base = match query.base.as_deref() {
        Some(code) => parse_currency(code)?,
        None => BASE_CURRENCY,
    };
    let table = fetch(&state)
        .await
        .map_err(ApiError::Upstream)?
        .rebase(base)
        .ok_or_else(|| ApiError::Upstream(format!("No rate for {base} in upstream response")))?;

    let rates = table
        .entries()
        .into_iter()
        .filter_map(|(currency, rate)| rate.round_dp(RATE_DP).to_f64().map(|r| (currency.code(), r)))
        .collect();
    Ok(Json(RatesBody {
        success: true,
        base: base.code(),
        rates,
        date: today(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ConvertQuery {
    pub amount: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConvertBody {
    pub success: bool,
    pub amount: f64,
    pub from: &'static str,
    pub to: &'static str,
    pub result: f64,
    pub rate: f64,
    pub date: String,
}

pub async fn convert(
    State(state): State<AppState>,
    Query(query): Query<ConvertQuery>,
) -> Result<Json<ConvertBody>, ApiError> {
    let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
    let (Some(amount), Some(from), Some(to)) =
        (present(query.amount), present(query.from), present(query.to))
    else {
        return Err(ApiError::BadRequest(
            "Missing required parameters: amount, from, to".to_string(),
        ));
    };

    let amount: Decimal = amount
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid amount: {amount}")))?;
    let from = parse_currency(&from)?;
    let to = parse_currency(&to)?;

    let table = fetch(&state).await.map_err(ApiError::Conversion)?;
    let (Some(rate), Some(result)) = (
        table.cross_rate(from, to),
        price::convert_between(amount, from, to, &table),
    ) else {
        return Err(ApiError::Conversion(format!("No rate for {from} to {to}")));
    };

    Ok(Json(ConvertBody {
        success: true,
        amount: amount.to_f64().unwrap_or_default(),
        from: from.code(),
        to: to.code(),
        result: result.to_f64().unwrap_or_default(),
        rate: rate.round_dp(RATE_DP).to_f64().unwrap_or_default(),
        date: today(),
    }))
}

async fn fetch(state: &AppState) -> Result<RateTable, String> {
    state.rates.fetch_rates().await.map_err(|e| e.to_string())
}

fn parse_currency(code: &str) -> Result<Currency, ApiError> {
    code.parse()
        .map_err(|e: anyhow::Error| ApiError::BadRequest(e.to_string()))
}

fn today() -> String {
    Utc::now().date_naive().to_string()
}
