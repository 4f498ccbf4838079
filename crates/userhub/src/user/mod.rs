//! User management module.
//!
//! Provides user CRUD operations, the safe user projection, and the
//! persistence calls the authentication core depends on.

mod models;
mod repository;
mod service;

pub use models::{CreateUserRequest, UpdateUserRequest, User, UserInfo, UserListQuery};
pub use repository::UserRepository;
pub use service::UserService;
