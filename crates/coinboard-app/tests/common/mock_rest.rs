//! Mock primary and secondary REST sources.
//!
//! Page 1 lists bitcoin and ethereum, page 2 solana and tron. Primary
//! requests for any other page answer HTTP 500.

use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;

const PAGE_ONE: [(&str, &str, &str); 2] = [("bitcoin", "BTC", "100"), ("ethereum", "ETH", "10")];
const PAGE_TWO: [(&str, &str, &str); 2] = [("solana", "SOL", "20"), ("tron", "TRX", "0.1")];

fn rows(page: u32) -> Option<&'static [(&'static str, &'static str, &'static str)]> {
    match page {
        1 => Some(&PAGE_ONE[..]),
        2 => Some(&PAGE_TWO[..]),
        _ => None,
    }
}

async fn assets(Query(q): Query<HashMap<String, String>>) -> Response {
    let offset: u32 = q["offset"].parse().unwrap();
    let limit: u32 = q["limit"].parse().unwrap();
    let Some(rows) = rows(offset / limit + 1) else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    };
    let data: Vec<Value> = rows
        .iter()
        .enumerate()
        .map(|(i, (id, symbol, price))| {
            json!({
                "id": id,
                "rank": (offset + i as u32 + 1).to_string(),
                "symbol": symbol,
                "name": id,
                "priceUsd": price,
                "marketCapUsd": "1000000",
                "changePercent24Hr": "1.5"
            })
        })
        .collect();
    Json(json!({ "data": data })).into_response()
}

async fn markets(Query(q): Query<HashMap<String, String>>) -> Response {
    let page: u32 = q["page"].parse().unwrap();
    let data: Vec<Value> = rows(page)
        .unwrap_or(&[])
        .iter()
        .map(|(id, symbol, _)| {
            json!({
                "id": id,
                "symbol": symbol.to_lowercase(),
                "price_change_percentage_7d_in_currency": 4.25,
                "sparkline_in_7d": {"price": [1.0, 2.0, 3.0]}
            })
        })
        .collect();
    Json(Value::Array(data)).into_response()
}

/// Serve both sources; returns the bound address.
pub async fn start() -> SocketAddr {
    let app = Router::new()
        .route("/v2/assets", get(assets))
        .route("/api/v3/coins/markets", get(markets));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}
