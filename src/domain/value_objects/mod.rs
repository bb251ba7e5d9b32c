pub mod ids;
pub mod parameters;
pub mod timestamps;
