//! Binding pattern evaluation for an ECMAScript interpreter.
//!
//! Patterns are compiled into a [`ast::PatternArena`] and evaluated against an
//! [`interpreter::Interpreter`], which supplies the object model, iterator
//! protocol and environments the algorithms run on.

pub mod ast;
pub mod interpreter;
pub mod static_semantics;
pub mod types;

pub use ast::{BuildError, ElementTarget, Expression, FormalParameters, NodeId, PatternArena, PropertyName};
pub use interpreter::{Abrupt, Completion, EnvRef, Environment, Interpreter, Interrupt, Options};
pub use types::{JsValue, PropertyKey};
