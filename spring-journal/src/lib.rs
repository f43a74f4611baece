mod auth;
mod client;
pub mod dashboard;
pub mod entry;
mod error;
pub mod lifecycle;
pub mod oauth;
pub mod profile;
pub mod response;
pub mod session;
pub mod validation;

pub use auth::*;
pub use client::*;
pub use error::*;
