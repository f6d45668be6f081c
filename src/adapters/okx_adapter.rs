//! OKX REST v5 client for sandbox and live execution.
//!
//! Every private call is signed with `base64(HMAC-SHA256(ts + method + path + body))`.
//! Sandbox requests go to the same host with the `x-simulated-trading: 1` header.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use reqwest::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use sha2::Sha256;

use crate::domain::error::TradedeskError;
use crate::domain::execution::Credentials;
use crate::domain::order::{OrderRequest, OrderSide, OrderType};
use crate::ports::trading_api_port::{
    RemoteOrder, RemoteOrderState, RemotePosition, TradingApiPort,
};

type HmacSha256 = Hmac<Sha256>;

const BALANCE_PATH: &str = "/api/v5/account/balance";
const ORDER_PATH: &str = "/api/v5/trade/order";
const POSITIONS_PATH: &str = "/api/v5/account/positions";

/// Every OKX response is wrapped in this envelope; `code == "0"` means success.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct AccountBalance {
    #[serde(default)]
    details: Vec<AssetBalance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetBalance {
    ccy: String,
    #[serde(default)]
    avail_bal: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderAck {
    ord_id: String,
    #[serde(default)]
    s_code: String,
    #[serde(default)]
    s_msg: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderDetail {
    ord_id: String,
    state: String,
    #[serde(default)]
    avg_px: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PositionDetail {
    inst_id: String,
    #[serde(default)]
    pos: String,
    #[serde(default)]
    avg_px: String,
    #[serde(default)]
    mark_px: String,
    #[serde(default)]
    upl: String,
}

pub struct OkxClient {
    http: reqwest::blocking::Client,
    credentials: Credentials,
    base_url: String,
    simulated: bool,
}

impl OkxClient {
    pub fn new(
        credentials: Credentials,
        base_url: &str,
        simulated: bool,
    ) -> Result<Self, TradedeskError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(TradedeskError::network)?;

        Ok(Self {
            http,
            credentials,
            base_url: base_url.trim_end_matches('/').to_string(),
            simulated,
        })
    }

    fn signed_request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&serde_json::Value>,
    ) -> Result<Vec<T>, TradedeskError> {
        let (url, path_and_query) = request_target(&self.base_url, path, query)?;
        let body_text = match body {
            Some(b) => b.to_string(),
            None => String::new(),
        };
        let timestamp = chrono::Utc::now()
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string();
        let signature = sign(
            &self.credentials.secret_key,
            &timestamp,
            method.as_str(),
            &path_and_query,
            &body_text,
        );

        tracing::debug!(url = %url, "okx request");
        let mut request = self
            .http
            .request(method, url)
            .header("OK-ACCESS-KEY", &self.credentials.api_key)
            .header("OK-ACCESS-SIGN", signature)
            .header("OK-ACCESS-TIMESTAMP", timestamp)
            .header("OK-ACCESS-PASSPHRASE", &self.credentials.passphrase)
            .header("Content-Type", "application/json");
        if self.simulated {
            request = request.header("x-simulated-trading", "1");
        }
        if !body_text.is_empty() {
            request = request.body(body_text);
        }

        let text = request
            .send()
            .and_then(|resp| resp.text())
            .map_err(TradedeskError::network)?;
        parse_envelope(&text)
    }
}

/// Full URL plus the percent-encoded `path?query` that goes into the signature.
pub fn request_target(
    base_url: &str,
    path: &str,
    query: &[(&str, &str)],
) -> Result<(reqwest::Url, String), TradedeskError> {
    let mut url = reqwest::Url::parse(&format!("{base_url}{path}"))
        .map_err(|e| TradedeskError::network(format!("invalid OKX url: {e}")))?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    let mut signed = url.path().to_string();
    if let Some(q) = url.query() {
        signed.push('?');
        signed.push_str(q);
    }
    Ok((url, signed))
}

/// `base64(HMAC-SHA256(secret, timestamp + METHOD + path + body))`.
pub fn sign(secret: &str, timestamp: &str, method: &str, path: &str, body: &str) -> String {
    // HMAC accepts keys of any length, so this never takes the error branch.
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(timestamp.as_bytes());
    mac.update(method.as_bytes());
    mac.update(path.as_bytes());
    mac.update(body.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// `BTC/USDT` → `BTC-USDT`.
pub fn inst_id(symbol: &str) -> String {
    symbol.replace('/', "-")
}

/// `BTC-USDT` → `BTC/USDT`.
pub fn symbol_from_inst_id(inst_id: &str) -> String {
    inst_id.replacen('-', "/", 1)
}

fn parse_envelope<T: DeserializeOwned>(text: &str) -> Result<Vec<T>, TradedeskError> {
    let envelope: Envelope<T> = serde_json::from_str(text)
        .map_err(|e| TradedeskError::network(format!("unexpected OKX response: {e}")))?;
    if envelope.code != "0" {
        return Err(TradedeskError::network(format!(
            "OKX error {}: {}",
            envelope.code, envelope.msg
        )));
    }
    Ok(envelope.data)
}

/// Numeric fields arrive as strings; empty means "not available".
fn parse_num(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        None
    } else {
        raw.parse().ok()
    }
}

fn parse_state(raw: &str) -> RemoteOrderState {
    match raw {
        "live" => RemoteOrderState::Live,
        "partially_filled" => RemoteOrderState::PartiallyFilled,
        "filled" => RemoteOrderState::Filled,
        "canceled" | "mmp_canceled" => RemoteOrderState::Canceled,
        _ => RemoteOrderState::Unknown,
    }
}

/// Spot order body. Market sizes are in the base currency (`tgtCcy=base_ccy`).
pub fn order_body(order: &OrderRequest) -> Result<serde_json::Value, TradedeskError> {
    let side = match order.side {
        OrderSide::Buy => "buy",
        OrderSide::Sell => "sell",
    };
    let mut body = serde_json::json!({
        "instId": inst_id(&order.symbol),
        "tdMode": "cash",
        "side": side,
        "ordType": order.order_type.to_string(),
        "sz": order.amount.to_string(),
    });

    match order.order_type {
        OrderType::Market => {
            body["tgtCcy"] = "base_ccy".into();
        }
        OrderType::Limit => {
            let price = order.price.ok_or_else(|| TradedeskError::Validation {
                reason: "limit order requires a price".into(),
            })?;
            body["px"] = price.to_string().into();
        }
    }
    Ok(body)
}

impl TradingApiPort for OkxClient {
    fn fetch_balance(&self, asset: &str) -> Result<f64, TradedeskError> {
        let accounts: Vec<AccountBalance> =
            self.signed_request(Method::GET, BALANCE_PATH, &[("ccy", asset)], None)?;
        Ok(accounts
            .iter()
            .flat_map(|a| a.details.iter())
            .find(|d| d.ccy == asset)
            .and_then(|d| parse_num(&d.avail_bal))
            .unwrap_or(0.0))
    }

    fn create_order(&self, order: &OrderRequest) -> Result<RemoteOrder, TradedeskError> {
        let body = order_body(order)?;
        let acks: Vec<OrderAck> = self.signed_request(Method::POST, ORDER_PATH, &[], Some(&body))?;
        let ack = acks
            .into_iter()
            .next()
            .ok_or_else(|| TradedeskError::network("OKX returned no order acknowledgement"))?;
        if !ack.s_code.is_empty() && ack.s_code != "0" {
            return Err(TradedeskError::network(format!(
                "OKX rejected order {}: {}",
                ack.s_code, ack.s_msg
            )));
        }
        tracing::info!(order_id = %ack.ord_id, "okx order accepted");
        Ok(RemoteOrder {
            order_id: ack.ord_id,
            state: RemoteOrderState::Live,
            avg_price: None,
        })
    }

    fn fetch_order(&self, symbol: &str, order_id: &str) -> Result<RemoteOrder, TradedeskError> {
        let inst = inst_id(symbol);
        let query = [("instId", inst.as_str()), ("ordId", order_id)];
        let details: Vec<OrderDetail> =
            self.signed_request(Method::GET, ORDER_PATH, &query, None)?;
        let detail = details
            .into_iter()
            .next()
            .ok_or_else(|| TradedeskError::network(format!("order {order_id} not found")))?;
        Ok(RemoteOrder {
            order_id: detail.ord_id,
            state: parse_state(&detail.state),
            avg_price: parse_num(&detail.avg_px),
        })
    }

    fn fetch_positions(&self) -> Result<Vec<RemotePosition>, TradedeskError> {
        let details: Vec<PositionDetail> =
            self.signed_request(Method::GET, POSITIONS_PATH, &[], None)?;
        Ok(details
            .into_iter()
            .filter_map(|p| {
                let amount = parse_num(&p.pos)?;
                if amount == 0.0 {
                    return None;
                }
                Some(RemotePosition {
                    symbol: symbol_from_inst_id(&p.inst_id),
                    amount,
                    entry_price: parse_num(&p.avg_px).unwrap_or(0.0),
                    mark_price: parse_num(&p.mark_px).unwrap_or(0.0),
                    unrealized_pnl: parse_num(&p.upl).unwrap_or(0.0),
                })
            })
            .collect())
    }
}
