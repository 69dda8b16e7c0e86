//! Time-parametrized boundary expressions.
//!
//! Expressions are Rhai expressions in the single variable `t`, compiled
//! once when their row is applied and evaluated on every physical step.
//!
//! On top of the Rhai arithmetic operators (`+ - * / % **`) the engine
//! provides:
//!
//! - constants `pi` and `e`
//! - `sin cos tan asin acos atan sinh cosh tanh exp ln log log10 log2 sqrt
//!   abs floor ceil round sign step`, and the two-argument `min max pow
//!   atan2`, all accepting integer or float arguments
//! - float division and powers for integer operands, so `1/2` is `0.5`
//!
//! Note that unary minus binds tighter than `**`: write `-(x ** 2)`.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use rhai::{Dynamic, Engine, EvalAltResult, ParseError, ParseErrorType, Scope, AST, FLOAT, INT};

use crate::error::ExpressionError;

/// Maximum nesting of a single expression.
pub const MAX_EXPRESSION_DEPTH: usize = 64;

/// Operation budget of one evaluation.
const MAX_OPERATIONS: u64 = 10_000;

fn heaviside(x: FLOAT) -> FLOAT {
    if x >= 0.0 {
        1.0
    } else {
        0.0
    }
}

fn sign(x: FLOAT) -> FLOAT {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

macro_rules! register_unary {
    ($engine:ident, $($name:literal => $f:expr),* $(,)?) => {
        $(
            $engine.register_fn($name, |x: FLOAT| -> FLOAT { $f(x) });
            $engine.register_fn($name, |x: INT| -> FLOAT { $f(x as FLOAT) });
        )*
    };
}

macro_rules! register_binary {
    ($engine:ident, $($name:literal => $f:expr),* $(,)?) => {
        $(
            $engine.register_fn($name, |a: FLOAT, b: FLOAT| -> FLOAT { $f(a, b) });
            $engine.register_fn($name, |a: INT, b: FLOAT| -> FLOAT { $f(a as FLOAT, b) });
            $engine.register_fn($name, |a: FLOAT, b: INT| -> FLOAT { $f(a, b as FLOAT) });
            $engine.register_fn($name, |a: INT, b: INT| -> FLOAT { $f(a as FLOAT, b as FLOAT) });
        )*
    };
}

fn build_engine() -> Engine {
    let mut engine = Engine::new();

    engine.set_max_expr_depths(MAX_EXPRESSION_DEPTH, MAX_EXPRESSION_DEPTH);
    engine.set_max_call_levels(16);
    engine.set_max_operations(MAX_OPERATIONS);
    engine.set_max_string_size(256);
    engine.set_max_array_size(16);
    engine.set_max_map_size(16);

    // Registered operators only take precedence over the built-in ones with
    // fast operators disabled.
    engine.set_fast_operators(false);
    engine.register_fn("/", |a: INT, b: INT| -> FLOAT { a as FLOAT / b as FLOAT });
    engine.register_fn("**", |a: INT, b: INT| -> FLOAT {
        (a as FLOAT).powf(b as FLOAT)
    });

    register_unary!(engine,
        "sin" => FLOAT::sin,
        "cos" => FLOAT::cos,
        "tan" => FLOAT::tan,
        "asin" => FLOAT::asin,
        "acos" => FLOAT::acos,
        "atan" => FLOAT::atan,
        "sinh" => FLOAT::sinh,
        "cosh" => FLOAT::cosh,
        "tanh" => FLOAT::tanh,
        "exp" => FLOAT::exp,
        "ln" => FLOAT::ln,
        "log" => FLOAT::ln,
        "log10" => FLOAT::log10,
        "log2" => FLOAT::log2,
        "sqrt" => FLOAT::sqrt,
        "abs" => FLOAT::abs,
        "floor" => FLOAT::floor,
        "ceil" => FLOAT::ceil,
        "round" => FLOAT::round,
        "sign" => sign,
        "step" => heaviside,
        "heaviside" => heaviside,
    );

    register_binary!(engine,
        "min" => FLOAT::min,
        "max" => FLOAT::max,
        "pow" => FLOAT::powf,
        "atan2" => FLOAT::atan2,
    );

    engine
}

fn engine() -> &'static Engine {
    static ENGINE: OnceLock<Engine> = OnceLock::new();
    ENGINE.get_or_init(build_engine)
}

fn scope_at(t: f64) -> Scope<'static> {
    let mut scope = Scope::new();
    scope.push_constant("pi", std::f64::consts::PI);
    scope.push_constant("e", std::f64::consts::E);
    scope.push("t", t);
    scope
}

fn from_parse_error(err: ParseError) -> ExpressionError {
    let ParseError(kind, position) = err;
    match *kind {
        ParseErrorType::ExprTooDeep => ExpressionError::TooDeep {
            limit: MAX_EXPRESSION_DEPTH,
        },
        other => ExpressionError::Syntax {
            message: other.to_string(),
            line: position.line().unwrap_or(0),
            column: position.position().unwrap_or(0),
        },
    }
}

fn from_eval_error(err: Box<EvalAltResult>) -> ExpressionError {
    match *err {
        EvalAltResult::ErrorVariableNotFound(name, _) => ExpressionError::UnknownIdentifier(name),
        EvalAltResult::ErrorFunctionNotFound(signature, _) => {
            ExpressionError::UnknownFunction(signature)
        }
        other => ExpressionError::Evaluation(other.to_string()),
    }
}

/// A compiled boundary-drive expression.
///
/// Cloning is cheap; the compiled tree is shared.
#[derive(Clone)]
pub struct BoundaryExpression {
    source: Arc<str>,
    ast: Arc<AST>,
}

impl BoundaryExpression {
    /// Compile `text` into an evaluable expression.
    ///
    /// The expression is also evaluated once at `t = 0`, so unknown names
    /// are rejected here rather than on every step. Numeric failures at
    /// `t = 0` are not an error.
    pub fn parse(text: &str) -> Result<Self, ExpressionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ExpressionError::Empty);
        }

        let ast = engine()
            .compile_expression_with_scope(&scope_at(0.0), text)
            .map_err(from_parse_error)?;
        let expr = Self {
            source: Arc::from(text),
            ast: Arc::new(ast),
        };

        match expr.evaluate(0.0) {
            Err(
                e @ (ExpressionError::UnknownIdentifier(_)
                | ExpressionError::UnknownFunction(_)
                | ExpressionError::NotANumber(_)),
            ) => Err(e),
            _ => Ok(expr),
        }
    }

    /// The text this expression was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate at time `t`.
    ///
    /// NaN or infinite results are reported as [`ExpressionError::NonFinite`].
    pub fn evaluate(&self, t: f64) -> Result<f64, ExpressionError> {
        let mut scope = scope_at(t);
        let result: Dynamic = engine()
            .eval_ast_with_scope(&mut scope, &self.ast)
            .map_err(from_eval_error)?;

        let value = match result.as_float() {
            Ok(v) => v,
            Err(_) => match result.as_int() {
                Ok(i) => i as f64,
                Err(_) => return Err(ExpressionError::NotANumber(result.type_name().to_string())),
            },
        };

        if value.is_finite() {
            Ok(value)
        } else {
            Err(ExpressionError::NonFinite { time: t, value })
        }
    }
}

impl fmt::Debug for BoundaryExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BoundaryExpression")
            .field(&&*self.source)
            .finish()
    }
}

impl fmt::Display for BoundaryExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for BoundaryExpression {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl PartialEq for BoundaryExpression {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}
