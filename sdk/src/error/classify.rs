//! Backend fault classification.
//!
//! The ledger endpoint reports failures as an HTTP status plus a problem
//! document whose shape depends on what went wrong:
//!
//! ```text
//! {
//!   "type":   "https://ledger.example/errors/transaction_failed",
//!   "title":  "Transaction Failed",
//!   "status": 400,
//!   "extras": { "result_codes": { "transaction": "tx_failed",
//!                                 "operations": ["op_success", "op_no_destination"] } }
//! }
//! ```
//!
//! [`classify`] turns that into exactly one [`LedgerError`]. Precedence:
//!
//! 1. No status at all: the request never got an answer, so `Network`.
//! 2. Result codes present: the *first* operation code that is not
//!    `op_success` decides. Later operations are not consulted; if every
//!    operation succeeded, the transaction code decides.
//! 3. Otherwise the problem `type` decides (only its last path segment).
//! 4. Throttling statuses without a usable type (429/503/504).
//! 5. Anything else is `Internal`. The classifier never fails.

use serde::{Deserialize, Serialize};

use super::{BadRequestReason, LedgerError};

/// What the transport collaborator hands back when a call fails.
///
/// `status` is `None` when no HTTP response was received at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFault {
    pub status: Option<u16>,
    pub body: serde_json::Value,
}

impl RawFault {
    /// A failure below HTTP: timeout, DNS, connection reset.
    pub fn transport(reason: &str) -> Self {
        Self {
            status: None,
            body: serde_json::json!({ "detail": reason }),
        }
    }

    /// An HTTP response with a (possibly empty) problem document.
    pub fn http(status: u16, body: serde_json::Value) -> Self {
        Self {
            status: Some(status),
            body,
        }
    }

    /// The standard problem document for a failed transaction.
    pub fn transaction_failed(tx_code: &str, op_codes: &[&str]) -> Self {
        Self::http(
            400,
            serde_json::json!({
                "type": "transaction_failed",
                "title": "Transaction Failed",
                "status": 400,
                "extras": {
                    "result_codes": {
                        "transaction": tx_code,
                        "operations": op_codes,
                    }
                }
            }),
        )
    }

    /// A problem document with just a type and a status.
    pub fn problem(status: u16, problem_type: &str) -> Self {
        Self::http(
            status,
            serde_json::json!({ "type": problem_type, "status": status }),
        )
    }
}

// ---------------------------------------------------------------------------
// Problem document
// ---------------------------------------------------------------------------

/// Each field is read on its own: a missing or mistyped field drops only
/// itself, never its siblings.
struct Problem<'a> {
    problem_type: Option<&'a str>,
    tx_code: Option<&'a str>,
    op_codes: Vec<&'a str>,
}

impl<'a> Problem<'a> {
    fn read(body: &'a serde_json::Value) -> Self {
        let result_codes = body.get("extras").and_then(|e| e.get("result_codes"));
        Self {
            problem_type: body.get("type").and_then(|t| t.as_str()),
            tx_code: result_codes
                .and_then(|c| c.get("transaction"))
                .and_then(|t| t.as_str()),
            op_codes: result_codes
                .and_then(|c| c.get("operations"))
                .and_then(|o| o.as_array())
                .map(|ops| ops.iter().filter_map(|op| op.as_str()).collect())
                .unwrap_or_default(),
        }
    }
}

const OP_SUCCESS: &str = "op_success";

// ---------------------------------------------------------------------------
// classify
// ---------------------------------------------------------------------------

/// Map a raw backend fault to exactly one [`LedgerError`].
///
/// Total: every input produces a value, unknown codes included.
pub fn classify(fault: &RawFault) -> LedgerError {
    let Some(status) = fault.status else {
        let reason = fault
            .body
            .get("detail")
            .and_then(|d| d.as_str())
            .unwrap_or("no response from ledger")
            .to_string();
        return LedgerError::Network {
            reason,
            fault: fault.clone(),
        };
    };

    let problem = Problem::read(&fault.body);

    if let Some(op_code) = problem.op_codes.iter().find(|c| **c != OP_SUCCESS) {
        return classify_operation(op_code, fault);
    }
    if let Some(tx_code) = problem.tx_code {
        return classify_transaction(tx_code, fault);
    }
    if let Some(problem_type) = problem.problem_type {
        return classify_problem_type(problem_type, fault);
    }

    match status {
        429 => bad_request(BadRequestReason::RateLimited, "http_429", fault),
        503 => bad_request(BadRequestReason::OverCapacity, "http_503", fault),
        504 => bad_request(BadRequestReason::Timeout, "http_504", fault),
        other => internal(&format!("http_{other}"), fault),
    }
}

fn classify_operation(code: &str, fault: &RawFault) -> LedgerError {
    let code_owned = code.to_string();
    let fault = fault.clone();
    match code {
        "op_no_destination" | "op_no_account" | "op_no_source_account" => {
            LedgerError::AccountNotFound {
                code: code_owned,
                fault,
            }
        }
        "op_already_exists" => LedgerError::AccountExists {
            code: code_owned,
            fault,
        },
        "op_underfunded" | "op_low_reserve" | "op_src_not_enough" => LedgerError::LowBalance {
            code: code_owned,
            fault,
        },
        "op_no_trust" | "op_src_no_trust" | "op_not_authorized" | "op_src_not_authorized"
        | "op_no_issuer" => LedgerError::AccountNotActivated {
            code: code_owned,
            fault,
        },
        "op_malformed" | "op_line_full" | "op_invalid_limit" | "op_bad_auth"
        | "op_not_supported" | "op_too_many_subentries" => LedgerError::BadRequest {
            reason: BadRequestReason::Malformed,
            code: code_owned,
            fault,
        },
        _ => LedgerError::Internal {
            code: code_owned,
            fault,
        },
    }
}

fn classify_transaction(code: &str, fault: &RawFault) -> LedgerError {
    match code {
        "tx_no_source_account" | "tx_no_account" => LedgerError::AccountNotFound {
            code: code.to_string(),
            fault: fault.clone(),
        },
        "tx_insufficient_balance" => LedgerError::LowBalance {
            code: code.to_string(),
            fault: fault.clone(),
        },
        "tx_bad_seq" => bad_request(BadRequestReason::StaleSequence, code, fault),
        "tx_bad_auth" | "tx_bad_auth_extra" | "tx_insufficient_fee"
        | "tx_too_early" | "tx_too_late" | "tx_missing_operation" | "tx_malformed" => {
            bad_request(BadRequestReason::Malformed, code, fault)
        }
        _ => internal(code, fault),
    }
}

fn classify_problem_type(problem_type: &str, fault: &RawFault) -> LedgerError {
    // Types are often URLs; only the last segment is meaningful.
    let code = problem_type.rsplit('/').next().unwrap_or(problem_type);
    match code {
        "rate_limit_exceeded" => bad_request(BadRequestReason::RateLimited, code, fault),
        "server_over_capacity" => bad_request(BadRequestReason::OverCapacity, code, fault),
        "timeout" => bad_request(BadRequestReason::Timeout, code, fault),
        "bad_request" | "transaction_malformed" | "forbidden" | "not_acceptable"
        | "unsupported_media_type" | "not_implemented" | "before_history" => {
            bad_request(BadRequestReason::Malformed, code, fault)
        }
        "not_found" => LedgerError::AccountNotFound {
            code: code.to_string(),
            fault: fault.clone(),
        },
        _ => internal(code, fault),
    }
}

fn bad_request(reason: BadRequestReason, code: &str, fault: &RawFault) -> LedgerError {
    LedgerError::BadRequest {
        reason,
        code: code.to_string(),
        fault: fault.clone(),
    }
}

fn internal(code: &str, fault: &RawFault) -> LedgerError {
    LedgerError::Internal {
        code: code.to_string(),
        fault: fault.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
