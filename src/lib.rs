pub mod ast_printer;
pub mod callable;
pub mod class;
pub mod environment;
pub mod error;
pub mod expr;
pub mod instance;
pub mod interpreter;
pub mod parser;
pub mod report;
pub mod resolver;
pub mod scanner;
pub mod session;
pub mod stmt;
pub mod token;
pub mod value;

pub use error::{LoxError, Result, RuntimeError};
pub use report::{CollectingReporter, ConsoleReporter, Printer, Reporter, Stdout, Transcript};
pub use session::Lox;
