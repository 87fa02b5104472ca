pub mod checkout;
pub mod entitlement;
pub mod purchase;

// Re-export common types
pub use checkout::{CheckoutRequest, CheckoutResponse, ValidatedCheckout};
pub use entitlement::{DeleteAccountRequest, DeleteAccountResponse, EntitlementStatus};
pub use purchase::{EntitlementType, NewPurchase, Purchase, PurchaseStatus};
