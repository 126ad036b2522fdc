pub mod auth;
pub mod documents;
pub mod employees;
pub mod flows;
pub mod items;
pub mod notifications;
pub mod tenancy;
pub mod terms;
pub mod verification;
