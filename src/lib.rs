#[macro_use]
extern crate log;
extern crate regex;

pub mod frontend;

pub use frontend::{read_grammar, read_program, tokenize, Error, Frontend, Instruction, Program, Value};
