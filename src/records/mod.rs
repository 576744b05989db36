//! CRM record types and the normalizers that build them from raw gateway values.
//!
//! Five collections are supported: sellers, contacts, interactions, sales and
//! purchase attempts. Free-text CRM fields (contact status, lost reason, channel,
//! attempt status) are mapped onto small enumerations by [`infer`].

pub mod infer;
mod normalize;
mod types;

pub use normalize::*;
pub use types::*;
