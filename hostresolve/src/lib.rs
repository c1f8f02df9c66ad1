pub mod address;
pub mod cache;
pub mod driver;
pub mod engine;
pub mod error;
pub mod host;
pub mod lookup;
pub mod registry;
pub mod schedule;

pub use address::{Address, AddressList, Family};
pub use driver::{FamilyFilter, ResolverDriver, TrustDnsDriver};
pub use engine::{Engine, EngineConfig};
pub use error::{EngineError, ErrorDomain, NetDbCode, StreamError};
pub use host::{ClientCallback, Host, InfoKind, InfoPayload, InfoValue};
pub use schedule::{EventLoop, ScheduleMode};

pub use tokio;
