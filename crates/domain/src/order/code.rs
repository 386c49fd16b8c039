//! Human-readable order codes.
//!
//! Codes are short enough to read over the phone and avoid look-alike
//! characters (`0/O`, `1/I`). Uniqueness is checked by an
//! [`OrderCodeRegistry`] at commit time.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::AggregateId;
use event_store::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Characters an order code may contain.
pub const ORDER_CODE_ALPHABET: &[u8; 32] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";

/// Length of a generated order code.
pub const ORDER_CODE_LEN: usize = 8;

/// A short order code such as `K7M2QX9D`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderCode(String);

impl OrderCode {
    /// Generates a random code.
    pub fn generate() -> Self {
        let bytes = Uuid::new_v4().into_bytes();
        let code = bytes
            .iter()
            .take(ORDER_CODE_LEN)
            .map(|b| ORDER_CODE_ALPHABET[(*b as usize) % ORDER_CODE_ALPHABET.len()] as char)
            .collect();
        Self(code)
    }

    /// Parses user input, normalising case. Returns None if the input is not
    /// a well-formed code.
    pub fn parse(raw: &str) -> Option<Self> {
        let code = raw.trim().to_ascii_uppercase();
        let well_formed = code.len() == ORDER_CODE_LEN
            && code.bytes().all(|b| ORDER_CODE_ALPHABET.contains(&b));
        well_formed.then_some(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tracks which order owns which code.
#[async_trait]
pub trait OrderCodeRegistry: Send + Sync {
    /// Claims `code` for `order_id`. Returns false if it is already taken.
    async fn reserve(&self, code: &OrderCode, order_id: AggregateId) -> Result<bool>;

    /// Frees a code whose order was never persisted.
    async fn release(&self, code: &OrderCode) -> Result<()>;

    /// Finds the order that owns `code`.
    async fn lookup(&self, code: &OrderCode) -> Result<Option<AggregateId>>;
}

/// In-memory registry for tests and single-node deployments.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderCodeRegistry {
    codes: Arc<RwLock<HashMap<OrderCode, AggregateId>>>,
}

impl InMemoryOrderCodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.codes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.codes.read().await.is_empty()
    }
}

#[async_trait]
impl OrderCodeRegistry for InMemoryOrderCodeRegistry {
    async fn reserve(&self, code: &OrderCode, order_id: AggregateId) -> Result<bool> {
        let mut codes = self.codes.write().await;
        if codes.contains_key(code) {
            return Ok(false);
        }
        codes.insert(code.clone(), order_id);
        Ok(true)
    }

    async fn release(&self, code: &OrderCode) -> Result<()> {
        self.codes.write().await.remove(code);
        Ok(())
    }

    async fn lookup(&self, code: &OrderCode) -> Result<Option<AggregateId>> {
        Ok(self.codes.read().await.get(code).copied())
    }
}
