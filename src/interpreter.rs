use std::collections::HashMap;
use std::mem;
use std::rc::Rc;

use log::{debug, info, warn};
use thiserror::Error;

use crate::callable::{Callable, LoxCallable, LoxFunction, NativeFunction};
use crate::class::{LoxClass, INITIALIZER};
use crate::environment::{undefined_variable, EnvRef, Environment};
use crate::error::RuntimeError;
use crate::expr::{Expr, ExprId};
use crate::report::{Printer, Reporter};
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Why statement execution stopped early.
///
/// `Return` is control flow, not failure: function calls catch it, while
/// `Error` keeps unwinding to [`Interpreter::interpret`].
#[derive(Error, Debug)]
pub enum Unwind {
    #[error(transparent)]
    Error(#[from] RuntimeError),

    #[error("Return signal with value: {0}")]
    Return(Value),
}

/// Nested calls allowed before a program is stopped with `Stack overflow.`;
/// keeps deep Lox recursion inside an 8 MB native stack.
pub const MAX_CALL_DEPTH: usize = 200;

/// Convenient alias for statement execution results.
pub type ExecResult = Result<(), Unwind>;

/// Convenient alias for expression evaluation results.
pub type EvalResult = Result<Value, RuntimeError>;

/// Tree‑walking evaluator.  Owns the global scope, the current scope and the
/// resolver's side‑table; lives for a whole session (every REPL line).
pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    locals: HashMap<ExprId, usize>,
    printer: Box<dyn Printer>,
    call_depth: usize,
}

impl Interpreter {
    /// Creates a new Interpreter and defines native functions such as `clock`.
    pub fn new(printer: Box<dyn Printer>) -> Self {
        info!("Initializing Interpreter");

        let globals: EnvRef = EnvRef::default();

        debug!("Defining native function 'clock'");

        globals.borrow_mut().define(
            "clock",
            Value::Callable(Callable::Native(Rc::new(NativeFunction::clock()))),
        );

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            printer,
            call_depth: 0,
        }
    }

    /// Record that the binding used by expression `id` lives `depth` scopes
    /// out.  Returns `false`, recording nothing, if `id` was already resolved.
    pub fn resolve(&mut self, id: ExprId, depth: usize) -> bool {
        if self.locals.contains_key(&id) {
            warn!("Expression {:?} already resolved; refusing depth {}", id, depth);
            return false;
        }

        self.locals.insert(id, depth);

        true
    }

    /// The resolved depth of expression `id`, if it names a local.
    pub fn resolved_depth(&self, id: ExprId) -> Option<usize> {
        self.locals.get(&id).copied()
    }

    /// Runs a program.  The first runtime error stops execution and goes to
    /// `reporter`; effects of earlier statements remain.
    pub fn interpret(&mut self, statements: &[Stmt], reporter: &mut dyn Reporter) {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            match self.execute(stmt) {
                Ok(()) => {}

                Err(Unwind::Error(e)) => {
                    debug!("Runtime error: {}", e);
                    reporter.runtime_error(e);
                    return;
                }

                // The resolver rejects top‑level `return`.
                Err(Unwind::Return(value)) => {
                    warn!("Top-level return of {} stopped execution", value);
                    return;
                }
            }
        }

        info!("Interpretation completed successfully");
    }

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> ExecResult {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;
                debug!("Printed value: {}", value);
                self.printer.print(&value.to_string());
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {}", name.lexeme, value);

                self.environment.borrow_mut().define(&name.lexeme, value);
            }

            Stmt::Block(statements) => {
                let scope: EnvRef = Environment::child_of(&self.environment);
                self.execute_block(statements, scope)?;
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)?;
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    self.execute(body)?;
                }
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                let function = LoxFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );

                self.environment.borrow_mut().define(
                    &declaration.name.lexeme,
                    Value::Callable(Callable::Function(Rc::new(function))),
                );
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                return Err(Unwind::Return(value));
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods)?,
        }

        Ok(())
    }

    /// Runs `statements` with `environment` as the current scope, restoring
    /// the previous scope on every exit path.
    pub fn execute_block(&mut self, statements: &[Stmt], environment: EnvRef) -> ExecResult {
        let previous: EnvRef = mem::replace(&mut self.environment, environment);

        let result: ExecResult = statements.iter().try_for_each(|stmt| self.execute(stmt));

        self.environment = previous;

        result
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<(), RuntimeError> {
        debug!("Declaring class '{}'", name.lexeme);

        // Placeholder so method closures can refer to the class by name.
        self.environment.borrow_mut().define(&name.lexeme, Value::Nil);

        let superclass: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Callable(Callable::Class(class)) => Some(class),

                _ => {
                    let at: &Token = match expr {
                        Expr::Variable { name, .. } => name,
                        _ => name,
                    };

                    return Err(RuntimeError::new(at, "Superclass must be a class."));
                }
            },

            None => None,
        };

        let enclosing: Option<EnvRef> = superclass.as_ref().map(|class| {
            let scope: EnvRef = Environment::child_of(&self.environment);
            scope.borrow_mut().define(
                "super",
                Value::Callable(Callable::Class(Rc::clone(class))),
            );

            mem::replace(&mut self.environment, scope)
        });

        let methods: HashMap<String, Rc<LoxFunction>> = methods
            .iter()
            .map(|method| {
                let function = LoxFunction::new(
                    Rc::clone(method),
                    Rc::clone(&self.environment),
                    method.name.lexeme == INITIALIZER,
                );

                (method.name.lexeme.clone(), Rc::new(function))
            })
            .collect();

        if let Some(enclosing) = enclosing {
            self.environment = enclosing;
        }

        let class = LoxClass::new(name.lexeme.clone(), superclass, methods);

        info!("Class '{}' defined", name.lexeme);

        self.environment
            .borrow_mut()
            .assign(name, Value::Callable(Callable::Class(Rc::new(class))))
    }

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> EvalResult {
        let value: Value = match expr {
            Expr::Literal(literal) => Value::from(literal),

            Expr::Grouping(inner) => self.evaluate(inner)?,

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right)?,

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right)?,

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;

                let short_circuits: bool = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if short_circuits {
                    left
                } else {
                    self.evaluate(right)?
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name)?,

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;

                match self.resolved_depth(*id) {
                    Some(distance) => {
                        if !Environment::assign_at(
                            &self.environment,
                            distance,
                            &name.lexeme,
                            value.clone(),
                        ) {
                            return Err(undefined_variable(name));
                        }
                    }

                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                value
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee: Value = self.evaluate(callee)?;

                let mut values: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                let Value::Callable(function) = callee else {
                    return Err(RuntimeError::new(
                        paren,
                        "Can only call functions and classes.",
                    ));
                };

                if values.len() != function.arity() {
                    return Err(RuntimeError::new(
                        paren,
                        format!(
                            "Expected {} arguments but got {}.",
                            function.arity(),
                            values.len()
                        ),
                    ));
                }

                if self.call_depth >= MAX_CALL_DEPTH {
                    return Err(RuntimeError::new(paren, "Stack overflow."));
                }

                self.call_depth += 1;
                let result: EvalResult = function.call(self, values);
                self.call_depth -= 1;

                result?
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => instance.get(name)?,

                _ => {
                    return Err(RuntimeError::new(name, "Only instances have properties."));
                }
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(RuntimeError::new(name, "Only instances have fields."));
                };

                let value: Value = self.evaluate(value)?;
                instance.set(name, value.clone());

                value
            }

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword)?,

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method)?,
        };

        debug!("Expression evaluated to: {}", value);

        Ok(value)
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> EvalResult {
        let right: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(RuntimeError::new(operator, "Must be Number.")),
            },

            TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),

            _ => Err(RuntimeError::new(operator, "Unsupported unary expression.")),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> EvalResult {
        let left: Value = self.evaluate(left)?;
        let right: Value = self.evaluate(right)?;

        debug!("Binary {} on {} and {}", operator.lexeme, left, right);

        let value: Value = match operator.token_type {
            TokenType::PLUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
                (Value::String(a), Value::String(b)) => Value::String(a + &b),
                _ => {
                    return Err(RuntimeError::new(
                        operator,
                        "Operands for '+' must be two numbers or two strings.",
                    ));
                }
            },

            TokenType::MINUS => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Value::Number(a - b)
            }

            TokenType::STAR => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Value::Number(a * b)
            }

            TokenType::SLASH => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Value::Number(a / b)
            }

            TokenType::GREATER => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Value::Bool(a > b)
            }

            TokenType::GREATER_EQUAL => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Value::Bool(a >= b)
            }

            TokenType::LESS => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Value::Bool(a < b)
            }

            TokenType::LESS_EQUAL => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Value::Bool(a <= b)
            }

            TokenType::EQUAL_EQUAL => Value::Bool(left == right),

            TokenType::BANG_EQUAL => Value::Bool(left != right),

            _ => {
                return Err(RuntimeError::new(
                    operator,
                    "Unsupported binary expression.",
                ));
            }
        };

        Ok(value)
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> EvalResult {
        match self.resolved_depth(id) {
            Some(distance) => Environment::get_at(&self.environment, distance, &name.lexeme)
                .ok_or_else(|| undefined_variable(name)),

            None => self.globals.borrow().get(name),
        }
    }

    /// `super.method`: find `method` on the superclass stored in the `super`
    /// scope and bind it to the `this` one scope further in.
    fn evaluate_super(&self, id: ExprId, keyword: &Token, method: &Token) -> EvalResult {
        let distance: usize = self
            .resolved_depth(id)
            .ok_or_else(|| undefined_variable(keyword))?;

        let Some(Value::Callable(Callable::Class(superclass))) =
            Environment::get_at(&self.environment, distance, "super")
        else {
            return Err(undefined_variable(keyword));
        };

        let Some(Value::Instance(object)) = distance
            .checked_sub(1)
            .and_then(|d| Environment::get_at(&self.environment, d, "this"))
        else {
            return Err(RuntimeError::new(keyword, "Undefined variable 'this'."));
        };

        let function: Rc<LoxFunction> =
            superclass.find_method(&method.lexeme).ok_or_else(|| {
                RuntimeError::new(
                    method,
                    format!("Undefined property '{}'.", method.lexeme),
                )
            })?;

        Ok(Value::Callable(Callable::Function(Rc::new(
            function.bind(object),
        ))))
    }
}

fn number_operands(
    operator: &Token,
    left: &Value,
    right: &Value,
) -> Result<(f64, f64), RuntimeError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(RuntimeError::new(
            operator,
            format!("Operands for '{}' must be numbers.", operator.lexeme),
        )),
    }
}
