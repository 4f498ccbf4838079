//! Organization management module.
//!
//! Organizations group users by reference and every operation passes the
//! per-operation authorization gates before reaching the store.

mod models;
mod repository;
mod service;

pub use models::{CreateOrganizationRequest, Organization, UpdateOrganizationRequest};
pub use repository::OrganizationRepository;
pub use service::OrganizationService;
