//! Core types and logic for the Wortschatz vocabulary trainer.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! storage backend, the NLP annotator and the content generator are reached
//! only through the traits in [`store`], [`annotate`] and [`generate`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod activity;
pub mod annotate;
pub mod cache;
pub mod document;
pub mod error;
pub mod evaluate;
pub mod generate;
pub mod ingest;
pub mod knowledge;
pub mod planner;
pub mod review;
pub mod store;
pub mod vocabulary;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use error::{Error, ErrorKind, Result};
