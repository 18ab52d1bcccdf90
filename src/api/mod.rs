//! HTTP surface: `POST /orders` plus claimed-address auth extraction
//! narrowed from a full `auth::middleware` (no signature
//! verification — that is an out-of-scope external collaborator).

pub mod auth;
pub mod handlers;
pub mod routes;
