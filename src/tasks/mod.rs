pub mod control;
pub mod coproc;
