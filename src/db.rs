pub mod user_repo;
pub use user_repo::UserRepository;
pub mod tenancy_repo;
pub use tenancy_repo::TenantRepository;
pub mod employee_repo;
pub use employee_repo::EmployeeRepository;
pub mod item_repo;
pub use item_repo::ItemRepository;
pub mod term_repo;
pub use term_repo::TermRepository;
pub mod audit_repo;
pub use audit_repo::AuditRepository;
pub mod operations_repo;
pub use operations_repo::OperationsRepository;
pub mod notification_repo;
pub use notification_repo::NotificationRepository;
