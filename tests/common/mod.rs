//! Shared test support: an in-memory `Backend` with fixtures, failure
//! toggles and recorded writes.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use pedidos_bot::appsheet::{Backend, FaqEntry, Product};
use pedidos_bot::flow::AppContext;
use pedidos_bot::orders::Order;
use pedidos_bot::session::InMemorySessionStore;

#[derive(Default)]
pub struct MockBackend {
    pub products: Vec<Product>,
    pub faqs: Vec<FaqEntry>,
    pub fail_reads: AtomicBool,
    pub fail_details: AtomicBool,
    pub fail_header: AtomicBool,
    pub read_calls: AtomicUsize,
    pub detail_writes: Mutex<Vec<Order>>,
    pub header_writes: Mutex<Vec<Order>>,
}

impl MockBackend {
    pub fn with_products(products: Vec<Product>) -> Self {
        Self {
            products,
            ..Default::default()
        }
    }

    pub fn with_faqs(faqs: Vec<FaqEntry>) -> Self {
        Self {
            faqs,
            ..Default::default()
        }
    }
}

pub fn product(name: &str, unit_value: f64) -> Product {
    Product {
        name: name.to_string(),
        unit_value,
    }
}

pub fn faq(question: &str, answer: &str) -> FaqEntry {
    FaqEntry {
        question: question.to_string(),
        answer: answer.to_string(),
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn products(&self) -> Result<Vec<Product>> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(anyhow!("simulated backend outage"));
        }
        Ok(self.products.clone())
    }

    async fn faq_entries(&self) -> Result<Vec<FaqEntry>> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(anyhow!("simulated backend outage"));
        }
        Ok(self.faqs.clone())
    }

    async fn add_order_details(&self, order: &Order) -> Result<()> {
        if self.fail_details.load(Ordering::SeqCst) {
            return Err(anyhow!("simulated detail write failure"));
        }
        self.detail_writes.lock().unwrap().push(order.clone());
        Ok(())
    }

    async fn add_order_header(&self, order: &Order) -> Result<()> {
        if self.fail_header.load(Ordering::SeqCst) {
            return Err(anyhow!("simulated header write failure"));
        }
        self.header_writes.lock().unwrap().push(order.clone());
        Ok(())
    }
}

// Lets a test keep a handle on the mock while the context owns it too.
#[async_trait]
impl Backend for Arc<MockBackend> {
    async fn products(&self) -> Result<Vec<Product>> {
        Backend::products(&**self).await
    }

    async fn faq_entries(&self) -> Result<Vec<FaqEntry>> {
        Backend::faq_entries(&**self).await
    }

    async fn add_order_details(&self, order: &Order) -> Result<()> {
        Backend::add_order_details(&**self, order).await
    }

    async fn add_order_header(&self, order: &Order) -> Result<()> {
        Backend::add_order_header(&**self, order).await
    }
}

/// Build an `AppContext` around a shared mock backend.
pub fn context(backend: Arc<MockBackend>, advisor_contact: Option<&str>) -> AppContext {
    AppContext {
        sessions: Box::new(InMemorySessionStore::new()),
        backend: Box::new(backend),
        advisor_contact: advisor_contact.map(String::from),
    }
}
