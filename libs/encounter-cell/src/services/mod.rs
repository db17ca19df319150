pub mod admission;
pub mod appointment;
pub mod home_visit;
pub mod lab;
pub mod lifecycle;
pub(crate) mod lookup;
pub mod outpatient;
