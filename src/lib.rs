//! # Pet Care Data Access
//!
//! Typed access to the hosted backend that stores pets, their appointments
//! and their photos. CRUD goes through the REST endpoint of the backend and
//! change notifications through its realtime websocket.
//!
//! A [`connection::Connection`] is built once from [`config::AppConfig`] and
//! handed to [`repo::supabase::SupabaseRepo`] and
//! [`realtime::RealtimeClient`].

pub mod api;
pub mod config;
pub mod connection;
pub mod consts;
pub mod error;
pub mod logger;
pub mod models;
pub mod realtime;
pub mod repo;

pub use connection::Connection;
pub use error::{DataError, DataResult, ErrorKind};
