//! Statement evaluation against one session namespace

use std::collections::HashMap;
use std::sync::Arc;

use super::parser::{parse_statement, BinOp, CmpOp, Expr, Stmt};
use super::value::{Raised, Value};
use super::{Evaluation, NativeFn, StatementExecutor};

/// One isolated interpreter session: a private namespace plus the natives
/// its module registered.
pub struct Session {
    namespace: HashMap<String, Value>,
    natives: Arc<HashMap<String, NativeFn>>,
    printed: String,
}

impl Session {
    pub fn new(natives: Arc<HashMap<String, NativeFn>>) -> Self {
        Self {
            namespace: HashMap::new(),
            natives,
            printed: String::new(),
        }
    }

    /// Variable currently bound in this session
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.namespace.get(name)
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, Raised> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Name(name) => self
                .namespace
                .get(name)
                .cloned()
                .ok_or_else(|| Raised::name_error(name)),
            Expr::List(items) => Ok(Value::List(
                items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<Result<_, _>>()?,
            )),
            Expr::Neg(inner) => match self.eval(inner)? {
                Value::Int(i) => i.checked_neg().map(Value::Int).ok_or_else(overflow),
                Value::Bool(b) => Ok(Value::Int(-i64::from(b))),
                Value::Float(f) => Ok(Value::Float(-f)),
                other => Err(Raised::type_error(format!(
                    "bad operand type for unary -: '{}'",
                    other.type_name()
                ))),
            },
            Expr::Not(inner) => Ok(Value::Bool(!self.eval(inner)?.is_truthy())),
            Expr::And(left, right) => {
                let left = self.eval(left)?;
                if left.is_truthy() {
                    self.eval(right)
                } else {
                    Ok(left)
                }
            }
            Expr::Or(left, right) => {
                let left = self.eval(left)?;
                if left.is_truthy() {
                    Ok(left)
                } else {
                    self.eval(right)
                }
            }
            Expr::Binary(op, left, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary(*op, left, right)
            }
            Expr::Compare(op, left, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                compare(*op, &left, &right).map(Value::Bool)
            }
            Expr::Index(target, index) => {
                let target = self.eval(target)?;
                let index = self.eval(index)?;
                subscript(&target, &index)
            }
            Expr::Call(name, args) => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(name, args)
            }
        }
    }

    fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Value, Raised> {
        if let Some(native) = self.natives.get(name) {
            return native(&args);
        }

        match name {
            "print" => {
                let line: Vec<String> = args.iter().map(Value::to_string).collect();
                self.printed.push_str(&line.join(" "));
                self.printed.push('\n');
                Ok(Value::None)
            }
            "len" => match one_arg(name, &args)? {
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                Value::List(items) => Ok(Value::Int(items.len() as i64)),
                other => Err(Raised::type_error(format!(
                    "object of type '{}' has no len()",
                    other.type_name()
                ))),
            },
            "str" => Ok(Value::Str(one_arg(name, &args)?.to_string())),
            "abs" => match one_arg(name, &args)? {
                Value::Int(i) => i.checked_abs().map(Value::Int).ok_or_else(overflow),
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => Err(Raised::type_error(format!(
                    "bad operand type for abs(): '{}'",
                    other.type_name()
                ))),
            },
            "min" | "max" => {
                let items = match args.as_slice() {
                    [Value::List(items)] => items.clone(),
                    _ => args,
                };
                let mut iter = items.into_iter();
                let mut best = iter
                    .next()
                    .ok_or_else(|| Raised::value_error(format!("{name}() arg is an empty sequence")))?;
                let wanted = if name == "min" { CmpOp::Lt } else { CmpOp::Gt };
                for item in iter {
                    if compare(wanted, &item, &best)? {
                        best = item;
                    }
                }
                Ok(best)
            }
            "sum" => match one_arg(name, &args)? {
                Value::List(items) => items
                    .iter()
                    .cloned()
                    .try_fold(Value::Int(0), |acc, item| binary(BinOp::Add, acc, item)),
                other => Err(Raised::type_error(format!(
                    "'{}' object is not iterable",
                    other.type_name()
                ))),
            },
            "range" => {
                let bounds: Vec<i64> = args
                    .iter()
                    .map(|a| {
                        a.as_i64().ok_or_else(|| {
                            Raised::type_error(format!(
                                "'{}' object cannot be interpreted as an integer",
                                a.type_name()
                            ))
                        })
                    })
                    .collect::<Result<_, _>>()?;
                let (start, stop) = match bounds.as_slice() {
                    [stop] => (0, *stop),
                    [start, stop] => (*start, *stop),
                    _ => {
                        return Err(Raised::type_error(format!(
                            "range expected 1 or 2 arguments, got {}",
                            args.len()
                        )))
                    }
                };
                Ok(Value::List((start..stop).map(Value::Int).collect()))
            }
            _ => Err(Raised::name_error(name)),
        }
    }
}

impl StatementExecutor for Session {
    fn execute(&mut self, statement: &str) -> Result<Evaluation, Raised> {
        self.printed.clear();
        let value = match parse_statement(statement)? {
            Stmt::Assign(name, expr) => {
                let value = self.eval(&expr)?;
                self.namespace.insert(name, value);
                None
            }
            Stmt::Expr(expr) => match self.eval(&expr)? {
                Value::None => None,
                value => Some(value),
            },
        };
        Ok(Evaluation {
            printed: std::mem::take(&mut self.printed),
            value,
        })
    }
}

fn overflow() -> Raised {
    Raised::new("OverflowError", "integer overflow")
}

fn one_arg<'a>(name: &str, args: &'a [Value]) -> Result<&'a Value, Raised> {
    match args {
        [arg] => Ok(arg),
        _ => Err(Raised::type_error(format!(
            "{name}() takes exactly one argument ({} given)",
            args.len()
        ))),
    }
}

fn unsupported(op: &str, left: &Value, right: &Value) -> Raised {
    Raised::type_error(format!(
        "unsupported operand type(s) for {op}: '{}' and '{}'",
        left.type_name(),
        right.type_name()
    ))
}

fn binary(op: BinOp, left: Value, right: Value) -> Result<Value, Raised> {
    match (op, &left, &right) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => return Ok(Value::Str(format!("{a}{b}"))),
        (BinOp::Add, Value::List(a), Value::List(b)) => {
            return Ok(Value::List(a.iter().chain(b).cloned().collect()))
        }
        (BinOp::Mul, Value::Str(s), Value::Int(n)) | (BinOp::Mul, Value::Int(n), Value::Str(s)) => {
            return Ok(Value::Str(s.repeat((*n).max(0) as usize)))
        }
        (BinOp::Mul, Value::List(items), Value::Int(n))
        | (BinOp::Mul, Value::Int(n), Value::List(items)) => {
            let mut out = Vec::new();
            for _ in 0..(*n).max(0) {
                out.extend(items.iter().cloned());
            }
            return Ok(Value::List(out));
        }
        _ => {}
    }

    let symbol = match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::FloorDiv => "//",
        BinOp::Mod => "%",
        BinOp::Pow => "**",
    };

    if let (Some(a), Some(b)) = (left.as_i64(), right.as_i64()) {
        return int_binary(op, a, b);
    }

    let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
        return Err(unsupported(symbol, &left, &right));
    };

    let result = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            if b == 0.0 {
                return Err(Raised::zero_division("float division by zero"));
            }
            a / b
        }
        BinOp::FloorDiv => {
            if b == 0.0 {
                return Err(Raised::zero_division("float floor division by zero"));
            }
            (a / b).floor()
        }
        BinOp::Mod => {
            if b == 0.0 {
                return Err(Raised::zero_division("float modulo"));
            }
            a - b * (a / b).floor()
        }
        BinOp::Pow => a.powf(b),
    };
    Ok(Value::Float(result))
}

fn int_binary(op: BinOp, a: i64, b: i64) -> Result<Value, Raised> {
    let result = match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Sub => a.checked_sub(b),
        BinOp::Mul => a.checked_mul(b),
        BinOp::Div => {
            if b == 0 {
                return Err(Raised::zero_division("division by zero"));
            }
            return Ok(Value::Float(a as f64 / b as f64));
        }
        BinOp::FloorDiv | BinOp::Mod => {
            if b == 0 {
                return Err(Raised::zero_division("integer division or modulo by zero"));
            }
            // floor semantics: the remainder takes the sign of the divisor
            let quotient = a.div_euclid(b) - i64::from(b < 0 && a.rem_euclid(b) != 0);
            if op == BinOp::FloorDiv {
                Some(quotient)
            } else {
                quotient.checked_mul(b).and_then(|q| a.checked_sub(q))
            }
        }
        BinOp::Pow => {
            if b < 0 {
                return Ok(Value::Float((a as f64).powf(b as f64)));
            }
            u32::try_from(b).ok().and_then(|exp| a.checked_pow(exp))
        }
    };
    result.map(Value::Int).ok_or_else(overflow)
}

fn compare(op: CmpOp, left: &Value, right: &Value) -> Result<bool, Raised> {
    let ordering = match (left, right) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::List(_), Value::List(_)) | (Value::None, _) | (_, Value::None) => None,
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    };

    match op {
        CmpOp::Eq => return Ok(values_equal(left, right)),
        CmpOp::NotEq => return Ok(!values_equal(left, right)),
        _ => {}
    }

    let Some(ordering) = ordering else {
        return Err(Raised::type_error(format!(
            "'{}' not supported between instances of '{}' and '{}'",
            op.symbol(),
            left.type_name(),
            right.type_name()
        )));
    };

    Ok(match op {
        CmpOp::Lt => ordering.is_lt(),
        CmpOp::Le => ordering.is_le(),
        CmpOp::Gt => ordering.is_gt(),
        CmpOp::Ge => ordering.is_ge(),
        CmpOp::Eq | CmpOp::NotEq => unreachable!("handled above"),
    })
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::None, Value::None) => true,
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

fn subscript(target: &Value, index: &Value) -> Result<Value, Raised> {
    let Value::Int(i) = index else {
        return Err(Raised::type_error(format!(
            "{} indices must be integers, not {}",
            target.type_name(),
            index.type_name()
        )));
    };

    let resolve = |len: usize| -> Option<usize> {
        let len = len as i64;
        let idx = if *i < 0 { len + i } else { *i };
        (0..len).contains(&idx).then_some(idx as usize)
    };

    match target {
        Value::List(items) => resolve(items.len())
            .map(|idx| items[idx].clone())
            .ok_or_else(|| Raised::index_error("list index out of range")),
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            resolve(chars.len())
                .map(|idx| Value::Str(chars[idx].to_string()))
                .ok_or_else(|| Raised::index_error("string index out of range"))
        }
        other => Err(Raised::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(Arc::new(HashMap::new()))
    }

    fn value_of(session: &mut Session, statement: &str) -> Option<Value> {
        session.execute(statement).unwrap().value
    }

    #[test]
    fn test_arithmetic() {
        let mut s = session();
        assert_eq!(value_of(&mut s, "1+2"), Some(Value::Int(3)));
        assert_eq!(value_of(&mut s, "7 / 2"), Some(Value::Float(3.5)));
        assert_eq!(value_of(&mut s, "-7 // 2"), Some(Value::Int(-4)));
        assert_eq!(value_of(&mut s, "-7 % 3"), Some(Value::Int(2)));
        assert_eq!(value_of(&mut s, "7 % -3"), Some(Value::Int(-2)));
        assert_eq!(value_of(&mut s, "2 ** 10"), Some(Value::Int(1024)));
    }

    #[test]
    fn test_assignment_binds_and_yields_nothing() {
        let mut s = session();
        assert_eq!(value_of(&mut s, "x = 4"), None);
        assert_eq!(value_of(&mut s, "x * 2"), Some(Value::Int(8)));
        assert_eq!(s.get("x"), Some(&Value::Int(4)));
    }

    #[test]
    fn test_print_is_captured() {
        let mut s = session();
        let evaluation = s.execute("print('a', 1, [2])").unwrap();
        assert_eq!(evaluation.printed, "a 1 [2]\n");
        assert_eq!(evaluation.value, None);
    }

    #[test]
    fn test_raised_errors() {
        let mut s = session();
        let err = s.execute("1 / 0").unwrap_err();
        assert_eq!(err.to_string(), "ZeroDivisionError: division by zero");
        let err = s.execute("undefined + 1").unwrap_err();
        assert_eq!(err.to_string(), "NameError: name 'undefined' is not defined");
        let err = s.execute("[1][3]").unwrap_err();
        assert_eq!(err.kind, "IndexError");
        let err = s.execute("'a' < 1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeError: '<' not supported between instances of 'str' and 'int'"
        );
    }

    #[test]
    fn test_builtins() {
        let mut s = session();
        assert_eq!(value_of(&mut s, "len('abc')"), Some(Value::Int(3)));
        assert_eq!(value_of(&mut s, "max(3, 9, 2)"), Some(Value::Int(9)));
        assert_eq!(value_of(&mut s, "min([4, 1])"), Some(Value::Int(1)));
        assert_eq!(value_of(&mut s, "sum(range(5))"), Some(Value::Int(10)));
        assert_eq!(value_of(&mut s, "str(2.0) + 'x'"), Some(Value::Str("2.0x".into())));
    }

    #[test]
    fn test_natives_take_precedence() {
        fn double(args: &[Value]) -> Result<Value, Raised> {
            match args {
                [Value::Int(i)] => Ok(Value::Int(i * 2)),
                _ => Err(Raised::type_error("double() expects an int")),
            }
        }
        let mut natives: HashMap<String, NativeFn> = HashMap::new();
        natives.insert("double".into(), double);
        let mut s = Session::new(Arc::new(natives));
        assert_eq!(value_of(&mut s, "double(21)"), Some(Value::Int(42)));
    }

    #[test]
    fn test_short_circuit() {
        let mut s = session();
        assert_eq!(value_of(&mut s, "0 or 'x'"), Some(Value::Str("x".into())));
        assert_eq!(value_of(&mut s, "False and missing"), Some(Value::Bool(false)));
    }
}
