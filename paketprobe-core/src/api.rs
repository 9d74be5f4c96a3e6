//! Typed client for the paket API used by the CRUD suites.

mod client;
mod types;

pub use client::{ApiClient, ApiReply, AuthReply, DEFAULT_API_TIMEOUT, Session};
pub use types::{FavoriteRequest, NewPaket, PaketQuery, PasswordChange, ProfileUpdate, Registration};
