//! Storefront Core
//!
//! Self-hosted e-commerce storefront service.
//!
//! ## Features
//! - Product catalog management
//! - Order placement with atomic inventory deduction
//! - Per-product review aggregation
//! - Pricing (shipping, savings, totals)
//! - Sales summary reporting

use thiserror::Error;
use uuid::Uuid;

pub mod domain;
pub mod events;
pub mod http;
pub mod service;
pub mod store;

// =============================================================================
// Core Types
// =============================================================================

/// Verified identity of the caller, supplied by the upstream authentication
/// middleware. The core never re-verifies it.
#[derive(Clone, Debug)]
pub struct Actor {
    pub id: Uuid,
    pub name: String,
    pub is_admin: bool,
}

// =============================================================================
// Error Types
// =============================================================================

/// Error kinds raised by the component that owns the corresponding
/// invariant. They propagate unmodified to the HTTP boundary, which maps
/// them to status codes; no component downgrades another's error.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Insufficient stock for {0}")]
    InsufficientStock(String),

    #[error("Order not found")]
    OrderNotFound,

    #[error("Review not found")]
    ReviewNotFound,

    #[error("Product already reviewed by this user")]
    DuplicateReview,

    #[error("Not authorized")]
    NotAuthorized,

    #[error("Rating must be an integer between 1 and 5")]
    InvalidRating,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
