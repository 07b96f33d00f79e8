// WASM-биндинги для веб-клиента

pub mod bindings;
pub mod console;
