//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic and persistence concerns so route
//! handlers can stay focused on protocol translation and auth plumbing.

pub mod audit;
pub mod auth;
pub mod element;
pub mod notebook;
pub mod page;
pub mod sticker;
pub mod validation;
