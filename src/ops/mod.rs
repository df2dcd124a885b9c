pub mod backup;
pub mod cleanup;
pub mod upload;
