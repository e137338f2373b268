#![allow(clippy::mutable_key_type)]
pub mod disasm;
pub mod emit;
pub mod generator;
pub mod machine;

pub use disasm::disassemble;
pub use emit::Emitter;
pub use generator::{compile_program, MAIN_NAME};
pub use machine::Machine;
