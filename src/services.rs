pub mod auth;
pub mod document_service;
pub mod flow_service;
pub mod notification_service;
pub mod registry_service;
pub mod tenancy_service;
pub mod term_service;
pub mod verification_service;
