pub mod assembler;
pub mod checkpoint;
pub mod executor;
pub mod job;
pub mod reporter;
pub mod retry;
