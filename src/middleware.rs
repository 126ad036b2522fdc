pub mod auth;
pub mod client_info;
pub mod i18n;
pub mod session;
pub mod tenancy;
