//! One interpreter session: the pipeline scanner → parser → resolver →
//! interpreter, with its reporter.
//!
//! A session keeps its global scope between [`Lox::run`] calls, so a REPL
//! feeds it one line at a time and calls [`Lox::reset`] in between.  Each
//! stage only runs if the ones before it reported nothing.

use std::fs;
use std::path::Path;

use log::{debug, info, log_enabled, Level};

use crate::ast_printer::AstPrinter;
use crate::error::Result;
use crate::expr::Expr;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::report::{Printer, Reporter};
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::stmt::Stmt;
use crate::value::Value;

pub struct Lox<R: Reporter> {
    interpreter: Interpreter,
    reporter: R,
}

impl<R: Reporter> Lox<R> {
    pub fn new<P: Printer + 'static>(reporter: R, printer: P) -> Self {
        info!("Starting Lox session");

        Self {
            interpreter: Interpreter::new(Box::new(printer)),
            reporter,
        }
    }

    /// Run a whole program.  Diagnostics go to the reporter; a program with
    /// any lexical, syntax or resolution error is not executed at all.
    pub fn run(&mut self, source: &str) {
        let Some(statements) = self.front_end(source) else {
            return;
        };

        self.interpreter.interpret(&statements, &mut self.reporter);
    }

    /// Scan and parse a single expression, as the `parse` command does.
    pub fn parse_expression(&mut self, source: &str) -> Option<Expr> {
        let tokens = Scanner::new(source).scan_tokens(&mut self.reporter);
        let expr: Option<Expr> = Parser::new(tokens, &mut self.reporter).parse_expression();

        if self.reporter.had_error() {
            return None;
        }

        expr
    }

    /// Evaluate a single expression and return its value.  Runtime errors
    /// are reported and yield `None`.
    pub fn evaluate(&mut self, source: &str) -> Option<Value> {
        let expr: Expr = self.parse_expression(source)?;

        let statement = [Stmt::Expression(expr)];
        Resolver::new(&mut self.interpreter, &mut self.reporter).resolve(&statement);

        if self.reporter.had_error() {
            return None;
        }

        let [Stmt::Expression(expr)] = &statement else {
            return None;
        };

        match self.interpreter.evaluate(expr) {
            Ok(value) => {
                debug!("Evaluated to: {}", value);
                Some(value)
            }

            Err(e) => {
                self.reporter.runtime_error(e);
                None
            }
        }
    }

    /// Clear error state so the next REPL line starts fresh.  Globals stay.
    pub fn reset(&mut self) {
        self.reporter.reset();
    }

    pub fn had_error(&self) -> bool {
        self.reporter.had_error()
    }

    pub fn had_runtime_error(&self) -> bool {
        self.reporter.had_runtime_error()
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn reporter_mut(&mut self) -> &mut R {
        &mut self.reporter
    }

    fn front_end(&mut self, source: &str) -> Option<Vec<Stmt>> {
        let tokens = Scanner::new(source).scan_tokens(&mut self.reporter);
        let statements: Vec<Stmt> = Parser::new(tokens, &mut self.reporter).parse();

        if self.reporter.had_error() {
            info!("Syntax errors; skipping resolution");
            return None;
        }

        if log_enabled!(Level::Debug) {
            for stmt in &statements {
                debug!("Parsed: {}", AstPrinter::print_stmt(stmt));
            }
        }

        Resolver::new(&mut self.interpreter, &mut self.reporter).resolve(&statements);

        if self.reporter.had_error() {
            info!("Resolution errors; skipping execution");
            return None;
        }

        Some(statements)
    }
}

/// Read a source file as UTF‑8 text.
pub fn read_source(path: &Path) -> Result<String> {
    info!("Reading file: {:?}", path);

    let bytes: Vec<u8> = fs::read(path)?;

    info!("Read {} bytes from {:?}", bytes.len(), path);

    Ok(String::from_utf8(bytes)?)
}
