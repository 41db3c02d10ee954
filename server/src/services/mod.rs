pub mod license_sync;
pub mod sales;
pub mod stripe_service;
