// Services module for the Loged.in purchase backend
// Business logic layer for the application

pub mod account;
pub mod background_tasks;
pub mod backfill;
pub mod checkout;
pub mod entitlement;
pub mod features;
pub mod jwt;
pub mod notifier;
pub mod payment_provider;
pub mod reconciler;
pub mod stripe;

// Re-export commonly used services
pub use account::AccountService;
pub use background_tasks::initialize_background_tasks;
pub use backfill::{BackfillResult, BackfillService, SweepSummary};
pub use checkout::CheckoutService;
pub use entitlement::{EntitlementReader, EntitlementWatcher};
pub use features::PlanFeatures;
pub use jwt::{AuthenticatedUser, JwtError, JwtVerifier};
pub use notifier::{ChangeKind, EntitlementChange, EntitlementNotifier, SubscriptionEvent};
pub use payment_provider::{
    CheckoutSessionParams, CreatedCheckoutSession, PaymentProvider, ProviderError,
};
pub use reconciler::{ReconcileOutcome, SucceededPayment, UserReference, WebhookReconciler};
pub use stripe::StripeClient;
