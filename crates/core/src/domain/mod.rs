pub mod classification;
pub mod client;
pub mod pricing;
pub mod profile;
