pub mod pool;
pub mod probe;
pub mod session;

pub use pool::{PoolStatus, ProxyPool};
pub use probe::{Prober, TcpProber};
pub use session::ProxySession;
