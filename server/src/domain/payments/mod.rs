//! Application fee payments
//!
//! - `processor` - the `PaymentProcessor` seam and checkout session types
//! - `stripe` - Stripe REST implementation
//! - `checkout` - builds checkout sessions for unpaid applications
//! - `reconcile` - confirms payments and records them exactly once

pub mod checkout;
pub mod processor;
pub mod reconcile;
pub mod stripe;

pub use checkout::{CheckoutError, CheckoutInput, CheckoutService};
pub use processor::{CheckoutRequest, CheckoutSession, PaymentProcessor, ProcessorError};
pub use reconcile::{ReconcileError, ReconcileService, Reconciled};
pub use stripe::StripeClient;
