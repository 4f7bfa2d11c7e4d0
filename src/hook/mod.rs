pub mod connection_hook;
pub mod connector;
