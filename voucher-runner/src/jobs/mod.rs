pub mod acquire;
pub mod validate;

pub use acquire::AcquireWorker;
pub use validate::ValidateWorker;
