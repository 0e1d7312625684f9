//! Domain page abstractions composed over [`crate::session::Session`].

pub mod login;

pub use login::{LoginOutcome, LoginPage};
