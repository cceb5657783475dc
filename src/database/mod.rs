pub mod evolver;
pub mod manager;
pub mod provisioner;

pub use evolver::{EvolveOutcome, SchemaEvolver};
pub use manager::{DatabaseError, DatabaseManager};
pub use provisioner::{tenant_db_name, TenantProvisioner};
