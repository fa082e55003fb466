pub mod connection;
pub mod handshake;
