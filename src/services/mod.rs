//! Domain services used by the screen routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the auth flow's decisions and external calls so
//! route handlers can stay focused on forms, cookies and redirects.

pub mod auth_client;
pub mod clients;
pub mod guard;
pub mod navigation;
pub mod observer;
pub mod otp;
pub mod profile;
pub mod validation;
