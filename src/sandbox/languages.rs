pub mod java;
pub mod native;
pub mod python;
