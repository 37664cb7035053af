pub mod cache;
pub mod classify;
pub mod error;
pub mod host;
pub mod resolver;
pub mod url;

pub use cache::SessionHostCache;
pub use classify::{classify, is_public, AddressClass};
pub use error::GuardError;
pub use host::{HostDecision, HostDenyList, HostValidator};
pub use resolver::{OverlayResolver, Resolver, SystemResolver};
pub use url::{validate_url, ValidatedUrl};
