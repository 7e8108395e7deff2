pub mod cleanup;
pub mod outline;
