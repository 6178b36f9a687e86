pub mod behavior;
pub mod client;
pub mod sync;
pub mod transport;
pub mod wire;

pub use client::ReplicationClient;
