//! Program execution: register files, the interpreter, batch runs.

pub mod pool;
pub mod registers;
pub mod vm;
