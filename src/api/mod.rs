//! # Data-Access API
//!
//! Stateless functions, one per operation, used by the presentation layer.
//! Each one forwards to a [`crate::repo::PetRepo`] inside a logfire span and
//! returns the backend error untouched when the call fails.

pub mod appointment;
pub mod pet;
pub mod photo;
