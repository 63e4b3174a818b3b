//! Network-facing half of the engine: paced sessions and challenge solving.

pub mod captcha;
pub mod http_client;
