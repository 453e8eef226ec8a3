pub mod couples;
pub mod invites;
