pub(crate) mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod observability;
pub mod protocol;
pub mod routing;
pub mod state;
pub mod stream;
pub mod transport;

mod util;

pub use error::GatewayError;
pub use gateway::{Gateway, GatewayOutput};
