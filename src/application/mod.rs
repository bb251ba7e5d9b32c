pub mod context;
pub mod handlers;
pub mod shared;
pub mod usecases;
