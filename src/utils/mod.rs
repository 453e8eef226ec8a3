pub mod auth;
pub mod pairing;
