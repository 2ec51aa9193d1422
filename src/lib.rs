//! Terminal chat front end for a retrieval question-answering service.
//!
//! Conversations live in a single JSON record, questions go to `POST /ask`
//! and documents to `POST /upload-doc`.

pub mod app;
pub mod client;
pub mod config;
pub mod controller;
pub mod conversation;
pub mod error;
pub mod events;
pub mod logging;
pub mod state;
pub mod storage;
pub mod ui;

pub use error::{Error, Result};
