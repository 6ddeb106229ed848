//! Venue boundary: capability traits, the HTTP client, authentication,
//! and the bearer-token manager.
//!
//! Everything the worker core knows about the venue goes through the
//! `OrderApi`, `AccountApi`, and `AuthApi` traits; the REST client here is
//! one implementation of them.

pub mod api;
pub mod auth;
pub mod client;
pub mod dto;
pub mod error;
pub mod token;

pub use api::{
    AccountApi, AccountSnapshot, AuthApi, AuthToken, CancelAck, MarketInfo, OpenOrder, OrderApi,
    SettlementReceipt, SubmitAck, SubmitRequest,
};
pub use auth::AuthClient;
pub use client::PerpsRestClient;
pub use error::{LogicalErrorKind, VenueError, VenueResult};
pub use token::TokenManager;
