mod adyen;
mod csv;
mod stripe;

pub use adyen::AdyenParser;
pub use stripe::StripeParser;
