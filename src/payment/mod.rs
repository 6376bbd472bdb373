use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::db::StoreError;

pub mod api;
pub mod response;
pub mod service;

pub type Result<T> = std::result::Result<T, PaymentError>;

/// Root payment resource. The `id` is caller-assigned and acts as the
/// primary key in the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Payment {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub version: i64,
    pub organisation_id: String,
    pub attributes: Attributes,
}

/// Monetary transfer details. Opaque to the service beyond "present and
/// well-formed", no semantic checks on amounts, currencies or dates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attributes {
    pub amount: String,
    pub beneficiary_party: BeneficiaryParty,
    pub charges_information: ChargesInformation,
    pub currency: String,
    pub debtor_party: DebtorParty,
    pub end_to_end_reference: String,
    pub fx: Fx,
    pub numeric_reference: String,
    pub payment_id: String,
    pub payment_purpose: String,
    pub payment_scheme: String,
    pub payment_type: String,
    pub processing_date: String,
    pub reference: String,
    pub scheme_payment_sub_type: String,
    pub scheme_payment_type: String,
    pub sponsor_party: SponsorParty,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeneficiaryParty {
    pub account_name: String,
    pub account_number: String,
    pub account_number_code: String,
    pub account_type: i64,
    pub address: String,
    pub bank_id: String,
    pub bank_id_code: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebtorParty {
    pub account_name: String,
    pub account_number: String,
    pub account_number_code: String,
    pub address: String,
    pub bank_id: String,
    pub bank_id_code: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargesInformation {
    pub bearer_code: String,
    pub sender_charges: Vec<Charge>,
    pub receiver_charges_amount: String,
    pub receiver_charges_currency: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Charge {
    pub amount: String,
    pub currency: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fx {
    pub contract_reference: String,
    pub exchange_rate: String,
    pub original_amount: String,
    pub original_currency: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SponsorParty {
    pub account_number: String,
    pub bank_id: String,
    pub bank_id_code: String,
}

#[derive(Debug, PartialEq)]
pub enum ValidationError {
    MissingField(String),
    WrongType(String),
}

impl std::error::Error for ValidationError {}

impl Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::MissingField(field) => {
                write!(f, "required field {field} is empty")
            }
            ValidationError::WrongType(_) => f.write_str("type is not Payment"),
        }
    }
}

fn require(field: &str, value: &str) -> std::result::Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::MissingField(field.to_owned()));
    }
    Ok(())
}

/// Structural validation of a payment. Every required field is enumerated
/// here explicitly so the rule set stays auditable.
pub fn validate(payment: &Payment) -> std::result::Result<(), ValidationError> {
    require("type", &payment.kind)?;
    require("id", &payment.id)?;
    require("organisation_id", &payment.organisation_id)?;

    let attrs = &payment.attributes;
    require("attributes.amount", &attrs.amount)?;
    require("attributes.currency", &attrs.currency)?;
    require("attributes.end_to_end_reference", &attrs.end_to_end_reference)?;
    require("attributes.numeric_reference", &attrs.numeric_reference)?;
    require("attributes.payment_id", &attrs.payment_id)?;
    require("attributes.payment_purpose", &attrs.payment_purpose)?;
    require("attributes.payment_scheme", &attrs.payment_scheme)?;
    require("attributes.payment_type", &attrs.payment_type)?;
    require("attributes.processing_date", &attrs.processing_date)?;
    require("attributes.reference", &attrs.reference)?;
    require(
        "attributes.scheme_payment_sub_type",
        &attrs.scheme_payment_sub_type,
    )?;
    require("attributes.scheme_payment_type", &attrs.scheme_payment_type)?;

    let beneficiary = &attrs.beneficiary_party;
    require("beneficiary_party.account_name", &beneficiary.account_name)?;
    require(
        "beneficiary_party.account_number",
        &beneficiary.account_number,
    )?;
    require(
        "beneficiary_party.account_number_code",
        &beneficiary.account_number_code,
    )?;
    require("beneficiary_party.address", &beneficiary.address)?;
    require("beneficiary_party.bank_id", &beneficiary.bank_id)?;
    require("beneficiary_party.bank_id_code", &beneficiary.bank_id_code)?;
    require("beneficiary_party.name", &beneficiary.name)?;

    let charges = &attrs.charges_information;
    require("charges_information.bearer_code", &charges.bearer_code)?;
    require(
        "charges_information.receiver_charges_amount",
        &charges.receiver_charges_amount,
    )?;
    require(
        "charges_information.receiver_charges_currency",
        &charges.receiver_charges_currency,
    )?;
    if charges.sender_charges.is_empty() {
        return Err(ValidationError::MissingField(
            "charges_information.sender_charges".to_owned(),
        ));
    }
    for (i, charge) in charges.sender_charges.iter().enumerate() {
        require(&format!("sender_charges[{i}].amount"), &charge.amount)?;
        require(&format!("sender_charges[{i}].currency"), &charge.currency)?;
    }

    let debtor = &attrs.debtor_party;
    require("debtor_party.account_name", &debtor.account_name)?;
    require("debtor_party.account_number", &debtor.account_number)?;
    require(
        "debtor_party.account_number_code",
        &debtor.account_number_code,
    )?;
    require("debtor_party.address", &debtor.address)?;
    require("debtor_party.bank_id", &debtor.bank_id)?;
    require("debtor_party.bank_id_code", &debtor.bank_id_code)?;
    require("debtor_party.name", &debtor.name)?;

    let fx = &attrs.fx;
    require("fx.contract_reference", &fx.contract_reference)?;
    require("fx.exchange_rate", &fx.exchange_rate)?;
    require("fx.original_amount", &fx.original_amount)?;
    require("fx.original_currency", &fx.original_currency)?;

    let sponsor = &attrs.sponsor_party;
    require("sponsor_party.account_number", &sponsor.account_number)?;
    require("sponsor_party.bank_id", &sponsor.bank_id)?;
    require("sponsor_party.bank_id_code", &sponsor.bank_id_code)?;

    if !payment.kind.eq_ignore_ascii_case("Payment") {
        return Err(ValidationError::WrongType(payment.kind.clone()));
    }
    Ok(())
}

#[derive(Debug)]
pub enum PaymentError {
    /// Request body failed to decode at all.
    BadRequest(String),
    Validation(ValidationError),
    NotFound(String),
    Conflict,
    Storage(StoreError),
}

impl PaymentError {
    pub fn status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            PaymentError::BadRequest(_) | PaymentError::Validation(_) => StatusCode::BAD_REQUEST,
            PaymentError::NotFound(_) => StatusCode::NOT_FOUND,
            PaymentError::Conflict => StatusCode::CONFLICT,
            PaymentError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationError> for PaymentError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl std::error::Error for PaymentError {}

impl Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentError::BadRequest(msg) => write!(f, "bad request: {msg}"),
            PaymentError::Validation(e) => write!(f, "{e}"),
            PaymentError::NotFound(msg) => write!(f, "{msg}"),
            PaymentError::Conflict => f.write_str("already exists"),
            PaymentError::Storage(e) => write!(f, "storage error: {e}"),
        }
    }
}
