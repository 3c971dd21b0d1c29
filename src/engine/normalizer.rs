//! Error code normalization.
//!
//! Providers and merchants report failures with free-form codes
//! (`bank_timeout`, `Response-Time-Exceeded`, `MX_STRIPE_TIMEOUT`, ...).
//! This module folds them into a closed set of [`ErrorKind`]s that the
//! recommendation catalog is keyed by.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical failure reason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ProviderTimeout,
    ProviderUnavailable,
    InsufficientBalance,
    InvalidBeneficiaryData,
    InvalidBankAccount,
    AccountBlocked,
    AccountClosed,
    AuthorizationRequired,
    AuthorizationExpired,
    ProviderDeclined,
    RiskBlocked,
    AmlRejected,
    SanctionsMatch,
    InternalProcessingError,
    RetryLimitExceeded,
    PayoutLimitExceeded,
    DailyPayoutLimit,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 17] = [
        ErrorKind::ProviderTimeout,
        ErrorKind::ProviderUnavailable,
        ErrorKind::InsufficientBalance,
        ErrorKind::InvalidBeneficiaryData,
        ErrorKind::InvalidBankAccount,
        ErrorKind::AccountBlocked,
        ErrorKind::AccountClosed,
        ErrorKind::AuthorizationRequired,
        ErrorKind::AuthorizationExpired,
        ErrorKind::ProviderDeclined,
        ErrorKind::RiskBlocked,
        ErrorKind::AmlRejected,
        ErrorKind::SanctionsMatch,
        ErrorKind::InternalProcessingError,
        ErrorKind::RetryLimitExceeded,
        ErrorKind::PayoutLimitExceeded,
        ErrorKind::DailyPayoutLimit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ProviderTimeout => "PROVIDER_TIMEOUT",
            ErrorKind::ProviderUnavailable => "PROVIDER_UNAVAILABLE",
            ErrorKind::InsufficientBalance => "INSUFFICIENT_BALANCE",
            ErrorKind::InvalidBeneficiaryData => "INVALID_BENEFICIARY_DATA",
            ErrorKind::InvalidBankAccount => "INVALID_BANK_ACCOUNT",
            ErrorKind::AccountBlocked => "ACCOUNT_BLOCKED",
            ErrorKind::AccountClosed => "ACCOUNT_CLOSED",
            ErrorKind::AuthorizationRequired => "AUTHORIZATION_REQUIRED",
            ErrorKind::AuthorizationExpired => "AUTHORIZATION_EXPIRED",
            ErrorKind::ProviderDeclined => "PROVIDER_DECLINED",
            ErrorKind::RiskBlocked => "RISK_BLOCKED",
            ErrorKind::AmlRejected => "AML_REJECTED",
            ErrorKind::SanctionsMatch => "SANCTIONS_MATCH",
            ErrorKind::InternalProcessingError => "INTERNAL_PROCESSING_ERROR",
            ErrorKind::RetryLimitExceeded => "RETRY_LIMIT_EXCEEDED",
            ErrorKind::PayoutLimitExceeded => "PAYOUT_LIMIT_EXCEEDED",
            ErrorKind::DailyPayoutLimit => "DAILY_PAYOUT_LIMIT",
        }
    }

    /// Parse an exact canonical name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw spellings and the kind they map to.
///
/// Order matters: the substring fallback returns the first key found, so
/// earlier entries win when a compound code contains several keywords.
const ERROR_CODE_TABLE: &[(&str, ErrorKind)] = &[
    ("PROVIDER_TIMEOUT", ErrorKind::ProviderTimeout),
    ("RESPONSE_TIME_EXCEEDED", ErrorKind::ProviderTimeout),
    ("BANK_TIMEOUT", ErrorKind::ProviderTimeout),
    ("TIMEOUT", ErrorKind::ProviderTimeout),
    ("PROVIDER_UNAVAILABLE", ErrorKind::ProviderUnavailable),
    ("BANK_SERVICE_NOT_AVAILABLE", ErrorKind::ProviderUnavailable),
    ("UNAVAILABLE", ErrorKind::ProviderUnavailable),
    ("INSUFFICIENT_BALANCE", ErrorKind::InsufficientBalance),
    ("INSUFFICIENT_FUNDS", ErrorKind::InsufficientBalance),
    ("INSUFFICIENT", ErrorKind::InsufficientBalance),
    ("INVALID_ACCOUNT", ErrorKind::InvalidBeneficiaryData),
    ("INVALID_BENEFICIARY_DATA", ErrorKind::InvalidBeneficiaryData),
    ("INCORRECT_RECIPIENT_DATA", ErrorKind::InvalidBeneficiaryData),
    ("INVALID_DATA", ErrorKind::InvalidBeneficiaryData),
    ("INVALID_BANK_ACCOUNT", ErrorKind::InvalidBankAccount),
    ("ACCOUNT_BLOCKED", ErrorKind::AccountBlocked),
    ("BLOCKED_ACCOUNT", ErrorKind::AccountBlocked),
    ("BLOCKED", ErrorKind::AccountBlocked),
    ("ACCOUNT_CLOSED", ErrorKind::AccountClosed),
    ("BANK_ACCOUNT_CLOSED", ErrorKind::AccountClosed),
    ("CLOSED", ErrorKind::AccountClosed),
    ("AUTHORIZATION_REQUIRED", ErrorKind::AuthorizationRequired),
    ("SECURITY_CONFIRMATION_REQUIRED", ErrorKind::AuthorizationRequired),
    ("AUTHORIZATION_EXPIRED", ErrorKind::AuthorizationExpired),
    ("CONFIRMATION_EXPIRED", ErrorKind::AuthorizationExpired),
    ("EXPIRED", ErrorKind::AuthorizationExpired),
    ("PROVIDER_DECLINED", ErrorKind::ProviderDeclined),
    ("BANK_REJECTION", ErrorKind::ProviderDeclined),
    ("DECLINED", ErrorKind::ProviderDeclined),
    ("REJECTION", ErrorKind::ProviderDeclined),
    ("RISK_BLOCKED", ErrorKind::RiskBlocked),
    ("SECURITY_BLOCK", ErrorKind::RiskBlocked),
    ("RISK", ErrorKind::RiskBlocked),
    ("AML_REJECTED", ErrorKind::AmlRejected),
    ("REGULATORY_REJECTION", ErrorKind::AmlRejected),
    ("AML", ErrorKind::AmlRejected),
    ("SANCTIONS_MATCH", ErrorKind::SanctionsMatch),
    ("LEGAL_VALIDATION_REQUIRED", ErrorKind::SanctionsMatch),
    ("SANCTIONS", ErrorKind::SanctionsMatch),
    ("INTERNAL_PROCESSING_ERROR", ErrorKind::InternalProcessingError),
    ("PROCESSING_ERROR", ErrorKind::InternalProcessingError),
    ("ERROR", ErrorKind::InternalProcessingError),
    ("RETRY_LIMIT_EXCEEDED", ErrorKind::RetryLimitExceeded),
    ("TOO_MANY_FAILED_ATTEMPTS", ErrorKind::RetryLimitExceeded),
    ("RETRY_LIMIT", ErrorKind::RetryLimitExceeded),
    ("PAYOUT_LIMIT_EXCEEDED", ErrorKind::PayoutLimitExceeded),
    ("TRANSACTION_LIMIT_EXCEEDED", ErrorKind::PayoutLimitExceeded),
    ("LIMIT_EXCEEDED", ErrorKind::PayoutLimitExceeded),
    ("DAILY_PAYOUT_LIMIT", ErrorKind::DailyPayoutLimit),
    ("DAILY_LIMIT_REACHED", ErrorKind::DailyPayoutLimit),
    ("DAILY_LIMIT", ErrorKind::DailyPayoutLimit),
];

/// Keys this short are too ambiguous for substring matching.
const MIN_SUBSTRING_KEY_LEN: usize = 4;

/// Uppercase and replace whitespace and hyphens with underscores.
pub fn canonicalize(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| {
            if c.is_whitespace() || c == '-' {
                '_'
            } else {
                c
            }
        })
        .collect::<String>()
        .to_uppercase()
}

/// Map a raw error code to its canonical kind.
///
/// Exact table matches win; otherwise the first table key (in definition
/// order) contained in the code is used. Returns `None` for blank input and
/// for codes that match nothing.
pub fn normalize(raw: Option<&str>) -> Option<ErrorKind> {
    let raw = raw?;
    if raw.trim().is_empty() {
        return None;
    }

    let code = canonicalize(raw);

    ERROR_CODE_TABLE
        .iter()
        .find(|(key, _)| *key == code)
        .or_else(|| {
            ERROR_CODE_TABLE
                .iter()
                .find(|(key, _)| key.len() >= MIN_SUBSTRING_KEY_LEN && code.contains(key))
        })
        .map(|(_, kind)| *kind)
}
