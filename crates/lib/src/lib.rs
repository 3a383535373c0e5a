//! Chatter core library: transport session, protocol codec, dispatcher and async client
//! shared by the CLI and desktop front ends.

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod init;
pub mod protocol;
pub mod session;
