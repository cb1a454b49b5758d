//! Task checklist with realtime sync: an ordered board of categories and
//! tasks over a document store, kept live by a subscription aggregator
//! that merges the category listener with one task listener per category.

pub mod cli;
pub mod error;
pub mod live;
pub mod models;
pub mod output;
pub mod services;
pub mod store;
