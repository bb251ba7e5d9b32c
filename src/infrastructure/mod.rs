pub mod db;
pub mod producers;
