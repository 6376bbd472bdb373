use crate::db::{PaymentStore, StoreError};
use crate::payment::{Payment, PaymentError, Result, validate};

pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 100_000;

fn not_found(id: &str) -> PaymentError {
    PaymentError::NotFound(format!("paymentID:{id} not found"))
}

fn storage(e: StoreError) -> PaymentError {
    PaymentError::Storage(e)
}

/// Create a payment.
///
/// A resubmission that is structurally identical to the stored record is an
/// idempotent no-op reported as success; a differing payload under the same
/// id is a conflict and leaves the stored record untouched.
pub async fn create<S: PaymentStore>(store: &S, payment: Payment) -> Result<()> {
    validate(&payment)?;
    match store.get(&payment.id).await {
        Ok(existing) => {
            if existing == payment {
                Ok(())
            } else {
                Err(PaymentError::Conflict)
            }
        }
        Err(StoreError::NotFound) => store.create(&payment).await.map_err(storage),
        Err(e) => Err(storage(e)),
    }
}

pub async fn get<S: PaymentStore>(store: &S, id: &str) -> Result<Payment> {
    match store.get(id).await {
        Ok(payment) => Ok(payment),
        Err(StoreError::NotFound) => Err(not_found(id)),
        Err(e) => Err(storage(e)),
    }
}

/// Full-record replace. The id always comes from the path argument so a body
/// carrying a different id cannot repoint the update at another resource.
pub async fn update<S: PaymentStore>(store: &S, id: &str, mut payment: Payment) -> Result<()> {
    payment.id = id.to_owned();
    validate(&payment)?;
    match store.update(&payment).await {
        Ok(()) => Ok(()),
        Err(StoreError::NotFound) => Err(not_found(id)),
        Err(e) => Err(storage(e)),
    }
}

pub async fn delete<S: PaymentStore>(store: &S, id: &str) -> Result<()> {
    match store.delete(id).await {
        Ok(()) => Ok(()),
        Err(StoreError::NotFound) => Err(not_found(id)),
        Err(e) => Err(storage(e)),
    }
}

pub async fn list<S: PaymentStore>(store: &S, offset: i64, limit: i64) -> Result<Vec<Payment>> {
    match store.list(offset, limit).await {
        Ok(payments) => Ok(payments),
        Err(StoreError::NotFound) => Err(PaymentError::NotFound("no payments found".to_owned())),
        Err(e) => Err(storage(e)),
    }
}

/// Absent or unparseable offsets default to 0; negatives clamp to 0.
pub fn clamp_offset(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.parse::<i64>().ok())
        .map(|v| v.max(0))
        .unwrap_or(0)
}

/// Limits are honored only strictly inside (0, 100000); anything else falls
/// back to the default of 100.
pub fn clamp_limit(raw: Option<&str>) -> i64 {
    match raw.and_then(|v| v.parse::<i64>().ok()) {
        Some(v) if v > 0 && v < MAX_LIMIT => v,
        _ => DEFAULT_LIMIT,
    }
}
