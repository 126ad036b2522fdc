pub mod audit;
pub mod auth;
pub mod employee;
pub mod flow;
pub mod notification;
pub mod session;
pub mod tenancy;
pub mod term;
