//! # Bank
//!
//! Everything the daily job and the serving instances have to agree on.
//!
//! - [`payload`]: the published `{date, word, similarities}` record and its schema checks
//! - [`history`]: append-only log of past target words, stored as protobuf
//! - [`store`]: the distribution point the daily job publishes to and servers read from
//! - [`config`]: environment/secret loading shared by both binaries
//!
//! ## Normalization
//!
//! Every stored word and every incoming guess goes through [`normalize`]. Using
//! anything else on either side makes lookups silently miss.

pub mod config;
pub mod history;
pub mod payload;
pub mod store;

pub use payload::{DailyPayload, SimilarityEntry, normalize};
