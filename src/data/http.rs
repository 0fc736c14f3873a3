//! Marketplace catalog API client
//!
//! Blocking JSON client for a marketplace-style catalog API that wraps every
//! payload in a `{ "meta": ..., "data": ... }` envelope. Prices arrive as
//! decimal dollar strings and are converted to cents on the way in.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::{
    CatalogItem, CatalogSource, CategoryNode, Condition, ItemKind, PriceGuide, Quote, QuoteType,
    Throttle,
};
use crate::error::{CatalogError, Result};
use crate::money::Cents;

/// Default base URL for the marketplace API
pub const DEFAULT_BASE_URL: &str = "https://api.bricklink.com/api/store/v1";

/// Blocking client for the marketplace catalog API
#[derive(Debug)]
pub struct HttpSource {
    client: Client,
    base_url: String,
    token: Option<String>,
    country_code: String,
    currency_code: String,
    throttle: Throttle,
    /// Number of requests sent, successful or not
    requests: u32,
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl HttpSource {
    /// Creates a client for the given base URL with the default throttle
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            country_code: "US".to_string(),
            currency_code: "USD".to_string(),
            throttle: Throttle::default(),
            requests: 0,
        }
    }

    /// Sends `Authorization: Bearer <token>` with every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    /// Sets the request timeout; without one a hung request blocks forever
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        match Client::builder().timeout(timeout).build() {
            Ok(client) => self.client = client,
            Err(e) => log::warn!(
                "Failed to build HTTP client with {:?} timeout, keeping the previous one: {}",
                timeout,
                e
            ),
        }
        self
    }

    /// Sends a GET for `path` and unwraps the response envelope
    fn get<T: DeserializeOwned>(
        &mut self,
        path: &str,
        query: &[(&str, String)],
        draws: u32,
    ) -> Result<Option<T>> {
        self.throttle.pause(draws);
        self.requests += 1;

        let url = format!("{}/{}", self.base_url, path);
        log::debug!("GET {}", url);

        let mut request = self.client.get(&url).query(query);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send()?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(CatalogError::RateLimited(format!("HTTP {} for {}", status, path)));
        }
        if !status.is_success() {
            return Err(CatalogError::Status(status));
        }

        let text = response.text()?;
        let envelope: Envelope = serde_json::from_str(&text)?;
        if let Some(meta) = envelope.meta {
            if meta.code == 429 {
                return Err(CatalogError::RateLimited(meta.message));
            }
            if !(200..300).contains(&meta.code) {
                return Err(CatalogError::Status(
                    StatusCode::from_u16(meta.code).unwrap_or(StatusCode::BAD_GATEWAY),
                ));
            }
        }

        let empty = match &envelope.data {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            Value::Array(items) => items.is_empty(),
            _ => false,
        };
        if empty {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(envelope.data)?))
    }
}

impl CatalogSource for HttpSource {
    fn request_count(&self) -> u32 {
        self.requests
    }

    fn fetch_item(&mut self, kind: ItemKind, id: &str) -> Result<CatalogItem> {
        let path = format!("items/{}/{}", kind.as_str(), id);
        let item: ApiItem = self
            .get(&path, &[], 1)?
            .ok_or_else(|| CatalogError::empty(kind, id))?;
        item.into_catalog_item(kind)
    }

    fn fetch_category(&mut self, id: u32) -> Result<CategoryNode> {
        let path = format!("categories/{}", id);
        let category: ApiCategory = self
            .get(&path, &[], 1)?
            .ok_or_else(|| CatalogError::empty("category", id))?;
        Ok(CategoryNode {
            name: category.category_name,
            parent_id: category.parent_id.filter(|&p| p > 0),
        })
    }

    fn fetch_price_guide(
        &mut self,
        kind: ItemKind,
        id: &str,
        condition: Condition,
        quote_type: QuoteType,
        color: Option<u32>,
    ) -> Result<PriceGuide> {
        let path = format!("items/{}/{}/price", kind.as_str(), id);
        let mut query = vec![
            ("guide_type", quote_type.as_str().to_string()),
            ("new_or_used", condition.code().to_string()),
            ("country_code", self.country_code.clone()),
            ("currency_code", self.currency_code.clone()),
        ];
        if let Some(color) = color {
            query.push(("color_id", color.to_string()));
        }

        let guide: ApiPriceGuide = self
            .get(&path, &query, 2)?
            .ok_or_else(|| CatalogError::empty(format!("{} price guide", kind), id))?;
        guide.into_price_guide()
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    meta: Option<Meta>,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct Meta {
    code: u16,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiItem {
    no: String,
    name: String,
    category_id: u32,
    #[serde(default)]
    year_released: Option<u16>,
    #[serde(default)]
    weight: Option<String>,
    #[serde(default)]
    num_parts: Option<u32>,
    #[serde(default)]
    image_url: Option<String>,
}

impl ApiItem {
    fn into_catalog_item(self, kind: ItemKind) -> Result<CatalogItem> {
        if self.no.is_empty() {
            return Err(CatalogError::empty(kind, "<blank>"));
        }
        Ok(CatalogItem {
            no: self.no,
            name: self.name,
            kind,
            category_id: self.category_id,
            category_name: None,
            year_released: self.year_released.filter(|&y| y > 0),
            weight: self.weight.and_then(|w| w.trim().parse().ok()),
            num_parts: self.num_parts,
            image_url: self.image_url,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApiCategory {
    category_name: String,
    #[serde(default)]
    parent_id: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiPriceGuide {
    avg_price: String,
    total_quantity: u32,
    #[serde(default)]
    price_detail: Vec<ApiPriceDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiPriceDetail {
    quantity: u32,
    unit_price: String,
}

impl ApiPriceGuide {
    fn into_price_guide(self) -> Result<PriceGuide> {
        let avg_price = parse_price(&self.avg_price)?;
        let quotes = self
            .price_detail
            .into_iter()
            .map(|d| {
                Ok(Quote {
                    unit_price: parse_price(&d.unit_price)?,
                    quantity: d.quantity,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(PriceGuide {
            avg_price,
            total_quantity: self.total_quantity,
            quotes,
        })
    }
}

fn parse_price(s: &str) -> Result<Cents> {
    Cents::parse_dollars(s).ok_or_else(|| CatalogError::InvalidField(format!("price '{}'", s)))
}
