//! AppSheet row-store client.
//!
//! All remote persistence goes through the AppSheet REST API: `Find` reads
//! over the `Productos` and `FAQ` tables, `Add` writes to the `enc_pedido`
//! (header) and `Pedido` (detail) tables. Every call posts a JSON action
//! envelope authenticated with a static `ApplicationAccessKey` header.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Deserializer, Serialize};

use crate::orders::Order;

const APPSHEET_API_URL: &str = "https://api.appsheet.com/api/v2";

/// Read/write access to the remote tables. The conversation flow only sees
/// this trait, so tests can exercise it against a mock.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Fetch the full product table. `Find` has no server-side filtering;
    /// matching happens client-side on the complete row set.
    async fn products(&self) -> Result<Vec<Product>>;

    /// Fetch the full FAQ table.
    async fn faq_entries(&self) -> Result<Vec<FaqEntry>>;

    /// Add one detail row per order item to the `Pedido` table.
    async fn add_order_details(&self, order: &Order) -> Result<()>;

    /// Add the order header row to the `enc_pedido` table.
    async fn add_order_header(&self, order: &Order) -> Result<()>;
}

/// A row of the products table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Product {
    #[serde(rename = "nombreProducto")]
    pub name: String,
    #[serde(rename = "valor", deserialize_with = "number_or_string")]
    pub unit_value: f64,
}

/// A row of the FAQ table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FaqEntry {
    #[serde(rename = "pregunta")]
    pub question: String,
    #[serde(rename = "respuesta")]
    pub answer: String,
}

// AppSheet serves numeric columns as JSON numbers or as strings depending on
// the column configuration; accept both.
fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Serialize)]
struct ActionRequest<R: Serialize> {
    #[serde(rename = "Action")]
    action: &'static str,
    #[serde(rename = "Properties")]
    properties: Properties,
    #[serde(rename = "Rows")]
    rows: Vec<R>,
}

#[derive(Serialize, Default)]
struct Properties {
    #[serde(rename = "Locale", skip_serializing_if = "Option::is_none")]
    locale: Option<&'static str>,
}

#[derive(Serialize)]
struct OrderHeaderRow<'a> {
    pedidoid: &'a str,
    enc_total: f64,
    fecha: &'a str,
    cliente: &'a str,
    direccion: &'a str,
    celular: &'a str,
}

#[derive(Serialize)]
struct OrderDetailRow<'a> {
    pedidoid: &'a str,
    fecha: String,
    #[serde(rename = "nombreProducto")]
    product_name: &'a str,
    #[serde(rename = "cantidadProducto")]
    quantity: i64,
    valor_unit: f64,
    valor: f64,
}

/// Credentials identifying the AppSheet app.
#[derive(Debug, Clone)]
pub struct AppSheetCredentials {
    pub app_id: String,
    pub access_key: String,
}

/// HTTP client for the AppSheet API. Built once at startup and shared.
///
/// Constructed without credentials it degrades: every call fails with a
/// configuration error, which the matcher and order-writer layers convert to
/// empty results and `false`.
pub struct AppSheetClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Option<AppSheetCredentials>,
}

impl AppSheetClient {
    pub fn new(credentials: Option<AppSheetCredentials>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: APPSHEET_API_URL.to_string(),
            credentials,
        }
    }

    /// Override the API base URL (local test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn credentials(&self) -> Result<&AppSheetCredentials> {
        self.credentials
            .as_ref()
            .context("AppSheet credentials are not configured")
    }

    async fn post_action<R: Serialize>(
        &self,
        table: &str,
        request: &ActionRequest<R>,
    ) -> Result<reqwest::Response> {
        let creds = self.credentials()?;
        let url = format!(
            "{}/apps/{}/tables/{}/Action",
            self.base_url, creds.app_id, table
        );

        debug!("Posting {} action to table {}", request.action, table);

        let response = self
            .http
            .post(&url)
            .header("ApplicationAccessKey", &creds.access_key)
            .json(request)
            .send()
            .await
            .with_context(|| format!("request to table {table} failed"))?
            .error_for_status()
            .with_context(|| format!("table {table} returned an error status"))?;

        Ok(response)
    }

    async fn find_rows(&self, table: &str) -> Result<Vec<serde_json::Value>> {
        // For "Find", Rows stays empty; AppSheet returns every row.
        let request = ActionRequest {
            action: "Find",
            properties: Properties::default(),
            rows: Vec::<serde_json::Value>::new(),
        };

        let response = self.post_action(table, &request).await?;
        response
            .json()
            .await
            .with_context(|| format!("table {table} returned malformed rows"))
    }

    async fn add_rows<R: Serialize>(&self, table: &str, rows: Vec<R>) -> Result<()> {
        let request = ActionRequest {
            action: "Add",
            properties: Properties {
                locale: Some("es-US"),
            },
            rows,
        };

        self.post_action(table, &request).await?;
        Ok(())
    }
}

#[async_trait]
impl Backend for AppSheetClient {
    async fn products(&self) -> Result<Vec<Product>> {
        let rows = self.find_rows("Productos").await?;

        // Rows missing a name or price are skipped, not fatal.
        let products: Vec<Product> = rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<Product>(row) {
                Ok(product) => Some(product),
                Err(e) => {
                    warn!("Skipping malformed product row: {e}");
                    None
                }
            })
            .collect();

        info!("Fetched {} products", products.len());
        Ok(products)
    }

    async fn faq_entries(&self) -> Result<Vec<FaqEntry>> {
        let rows = self.find_rows("FAQ").await?;

        let entries: Vec<FaqEntry> = rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<FaqEntry>(row) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping malformed FAQ row: {e}");
                    None
                }
            })
            .collect();

        info!("Fetched {} FAQ entries", entries.len());
        Ok(entries)
    }

    async fn add_order_details(&self, order: &Order) -> Result<()> {
        let stamp = Utc::now().to_rfc3339();
        let rows: Vec<OrderDetailRow> = order
            .items
            .iter()
            .map(|item| OrderDetailRow {
                pedidoid: &order.order_id,
                fecha: stamp.clone(),
                product_name: &item.product_name,
                quantity: item.quantity,
                valor_unit: item.unit_value,
                valor: item.line_value,
            })
            .collect();

        self.add_rows("Pedido", rows).await
    }

    async fn add_order_header(&self, order: &Order) -> Result<()> {
        let row = OrderHeaderRow {
            pedidoid: &order.order_id,
            enc_total: order.total,
            fecha: &order.date,
            cliente: &order.customer_name,
            direccion: &order.address,
            celular: &order.phone,
        };

        self.add_rows("enc_pedido", vec![row]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_row_with_numeric_price() {
        let product: Product =
            serde_json::from_value(json!({ "nombreProducto": "Jabón Azul", "valor": 5000 }))
                .unwrap();
        assert_eq!(product.name, "Jabón Azul");
        assert_eq!(product.unit_value, 5000.0);
    }

    #[test]
    fn test_product_row_with_string_price() {
        let product: Product =
            serde_json::from_value(json!({ "nombreProducto": "Arroz", "valor": "2500.50" }))
                .unwrap();
        assert_eq!(product.unit_value, 2500.5);
    }

    #[test]
    fn test_product_row_rejects_garbage_price() {
        let result =
            serde_json::from_value::<Product>(json!({ "nombreProducto": "Arroz", "valor": "n/a" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_faq_row_deserialization() {
        let entry: FaqEntry = serde_json::from_value(json!({
            "pregunta": "¿Cuál es el horario?",
            "respuesta": "De 8am a 6pm.",
            "otraColumna": "ignorada"
        }))
        .unwrap();
        assert_eq!(entry.question, "¿Cuál es el horario?");
        assert_eq!(entry.answer, "De 8am a 6pm.");
    }

    #[test]
    fn test_find_envelope_shape() {
        let request = ActionRequest {
            action: "Find",
            properties: Properties::default(),
            rows: Vec::<serde_json::Value>::new(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({ "Action": "Find", "Properties": {}, "Rows": [] }));
    }

    #[test]
    fn test_add_envelope_carries_locale() {
        let request = ActionRequest {
            action: "Add",
            properties: Properties {
                locale: Some("es-US"),
            },
            rows: vec![json!({ "pedidoid": "1" })],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["Properties"]["Locale"], "es-US");
        assert_eq!(value["Action"], "Add");
    }
}
