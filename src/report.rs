//! Sinks the core writes into: diagnostics go to a [`Reporter`], the text of
//! every executed `print` goes to a [`Printer`].

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

use crate::error::{LoxError, RuntimeError};
use crate::token::Token;

/// Receives every lexical, syntax and runtime error of a run.
///
/// Only [`report`](Reporter::report) and the flag accessors are required;
/// the per‑stage helpers build the right [`LoxError`] variant.
pub trait Reporter {
    fn report(&mut self, error: LoxError);

    /// Has a lexical or syntax error been reported since the last reset?
    fn had_error(&self) -> bool;

    /// Has a runtime error been reported since the last reset?
    fn had_runtime_error(&self) -> bool;

    /// Clear both flags. Called between REPL lines.
    fn reset(&mut self);

    /// Error with a line but no token (scanner).
    fn error_at_line(&mut self, line: usize, message: &str) {
        self.report(LoxError::lex(line, message));
    }

    /// Syntax error tied to a token (parser).
    fn error_at_token(&mut self, token: &Token, message: &str) {
        self.report(LoxError::parse(token, message));
    }

    /// Static error tied to a token (resolver).
    fn resolve_error(&mut self, token: &Token, message: &str) {
        self.report(LoxError::resolve(token, message));
    }

    fn runtime_error(&mut self, error: RuntimeError) {
        self.report(LoxError::Runtime(error));
    }
}

/// Writes diagnostics to stderr.
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    had_error: bool,
    had_runtime_error: bool,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for ConsoleReporter {
    fn report(&mut self, error: LoxError) {
        debug!("Reporting: {}", error);

        if error.is_runtime() {
            self.had_runtime_error = true;
        } else {
            self.had_error = true;
        }

        eprintln!("{}", error);
    }

    fn had_error(&self) -> bool {
        self.had_error
    }

    fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    fn reset(&mut self) {
        self.had_error = false;
        self.had_runtime_error = false;
    }
}

/// Keeps every reported error in memory, in report order.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    pub errors: Vec<LoxError>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bare messages of all collected errors.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(LoxError::message).collect()
    }
}

impl Reporter for CollectingReporter {
    fn report(&mut self, error: LoxError) {
        self.errors.push(error);
    }

    fn had_error(&self) -> bool {
        self.errors.iter().any(|e| !e.is_runtime())
    }

    fn had_runtime_error(&self) -> bool {
        self.errors.iter().any(LoxError::is_runtime)
    }

    fn reset(&mut self) {
        self.errors.clear();
    }
}

/// Receives the stringified value of each executed `print` statement.
pub trait Printer {
    fn print(&mut self, text: &str);
}

/// Prints straight to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct Stdout;

impl Printer for Stdout {
    fn print(&mut self, text: &str) {
        println!("{}", text);
    }
}

/// Records printed lines in a buffer shared with every clone, optionally
/// echoing them to stdout.
#[derive(Debug, Default, Clone)]
pub struct Transcript {
    lines: Rc<RefCell<Vec<String>>>,
    echo: bool,
}

impl Transcript {
    pub fn new(echo: bool) -> Self {
        Self {
            lines: Rc::default(),
            echo,
        }
    }

    /// Snapshot of everything printed so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
}

impl Printer for Transcript {
    fn print(&mut self, text: &str) {
        self.lines.borrow_mut().push(text.to_string());

        if self.echo {
            println!("{}", text);
        }
    }
}
