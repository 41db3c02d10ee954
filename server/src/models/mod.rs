pub mod client;
pub mod contact;
pub mod license;
pub mod opportunity;
pub mod payment;
pub mod product;
pub mod task;
pub mod user;

pub use client::*;
pub use contact::*;
pub use license::*;
pub use opportunity::*;
pub use payment::*;
pub use product::*;
pub use task::*;
pub use user::*;
