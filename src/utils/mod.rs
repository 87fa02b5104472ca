// Utility modules for the purchase backend

pub mod audit_logger;
pub mod purchase_errors;
pub mod validation;

pub use audit_logger::{AuditAction, AuditLogger};
pub use purchase_errors::PurchaseError;
pub use validation::{require_field, trim_optional_field};
