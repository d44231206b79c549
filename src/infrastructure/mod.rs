pub mod json_file;
pub mod memory_kv;
