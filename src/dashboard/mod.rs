//! Dashboard data binding
//!
//! A [`DashboardHandle`] is what a dashboard view holds for its lifetime. It
//! exposes the collections for the selected date range together with the
//! loading, demo and error flags, and keeps them current as the shared cache
//! changes.

mod handle;
mod types;

pub use handle::DashboardHandle;
pub use types::DashboardData;
