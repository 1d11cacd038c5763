pub mod parameter;
pub mod session;
pub mod sieve;
