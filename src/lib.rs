//! salespulse - cached, date-filtered access to CRM collections
//!
//! Reads sellers, contacts, interactions, sales and purchase attempts from a
//! no-code database gateway, normalizes them into typed records and serves
//! them through a cache that never blocks a read on a snapshot it can still
//! show.
//!
//! - [`records`]: typed records and normalization of raw gateway rows
//! - [`gateway`]: paginated, filtered collection fetches
//! - [`range`]: date ranges, calendar-day comparison and reconciliation
//! - [`cache`]: the cache coordinator (tiers, in-flight sharing, subscribers)
//! - [`dashboard`]: per-view binding of a selected range to the cache
//! - [`kpi`]: dashboard indicators computed from a view's collections
//! - [`api`]: JSON read API over the coordinator

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod gateway;
pub mod kpi;
pub mod logging;
pub mod metrics;
pub mod range;
pub mod records;
