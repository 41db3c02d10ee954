pub mod auth;
pub mod billing;
pub mod clients;
pub mod customers;
pub mod dashboard;
pub mod health;
pub mod licenses;
pub mod opportunities;
pub mod products;
pub mod tags;
pub mod tasks;
pub mod webhooks;
