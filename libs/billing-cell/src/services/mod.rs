pub mod billing;
pub mod derivation;
pub mod payment;
