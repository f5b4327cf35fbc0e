/// State management module
///
/// This module handles all application state, including:
/// - Adjustment parameters and non-destructive editing (edit.rs)
/// - Shared data structures (data.rs)
/// - The central store and its closed action set (store.rs)
/// - Catalog persistence of store snapshots (library.rs)

pub mod data;
pub mod edit;
pub mod library;
pub mod store;

pub use store::{Action, Store, StoreState};
