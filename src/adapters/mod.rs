// Adapters layer: concrete implementations of the domain ports.

pub mod csv_import;
pub mod memory_store;
pub mod storage;
pub mod whatsapp;
