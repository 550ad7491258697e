pub mod api_credential;
pub mod proxy;
pub mod settings;

pub use api_credential::*;
pub use proxy::*;
pub use settings::*;
