pub mod pricing_api;

// Re-export commonly used types
pub use pricing_api::{PricingApiResponse, PricingFetcher, RestPricingClient};
