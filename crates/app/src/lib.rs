pub mod config;
pub mod runtime;
pub mod transport_udp;

pub use config::Settings;
