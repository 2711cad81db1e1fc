pub mod bills;
pub mod claims;
pub mod health;
pub mod rates;
