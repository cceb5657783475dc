pub mod directory;
pub mod domain;
pub mod publisher;
pub mod record;

pub use directory::SiteDirectory;
pub use domain::{DnsInstructions, DnsResolver, DomainService, DomainStatus, SystemDnsResolver};
pub use publisher::SitePublisher;
pub use record::{OwnerType, SiteRecord};
