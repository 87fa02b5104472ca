// Stripe integration: REST client, webhook signatures, wire types

pub mod client;
pub mod signature;
pub mod types;

pub use client::{is_payment_intent_id, StripeClient};
pub use signature::{compute_signature, SignatureError, WebhookVerifier};
pub use types::{CheckoutSession, PaymentIntent, StripeEvent, StripeEventKind};
