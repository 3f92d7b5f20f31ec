// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

/// Domain failures raised by the command layer. They travel inside
/// `anyhow::Error`, so callers that care can `downcast_ref::<ShopError>()`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShopError {
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("cannot move service order from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },
    #[error("service order {order} cannot be posted: {reason}")]
    NotPostable { order: String, reason: String },
    #[error("{what} is too large to compute")]
    Overflow { what: &'static str },
}

impl ShopError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ShopError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ShopError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
