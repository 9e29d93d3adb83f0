pub mod user_service;

#[cfg(test)]
pub mod user_tests;

pub use user_service::{DynUserService, LoginOutcome, SignupInput, UserService, UserServiceTrait};
