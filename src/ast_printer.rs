//! Parenthesized prefix rendering of expression trees, e.g.
//! `(* (- 123) (group 45.67))`. A debugging aid, also used to pin down
//! parser output in tests.

use crate::ast::{Expr, LiteralValue};
use crate::interner::Interner;

pub fn print_expr(interner: &Interner, expr: &Expr) -> String {
    match expr {
        Expr::Assign { name, value, .. } => format!(
            "(= {} {})",
            interner.resolve(name.lexeme),
            print_expr(interner, value)
        ),
        Expr::Binary {
            left,
            operator,
            right,
        }
        | Expr::Logical {
            left,
            operator,
            right,
        } => parenthesize(
            interner,
            &interner.resolve(operator.lexeme),
            &[left.as_ref(), right.as_ref()],
        ),
        Expr::Call {
            callee, arguments, ..
        } => {
            let mut out = format!("(call {}", print_expr(interner, callee));
            for argument in arguments {
                out.push(' ');
                out.push_str(&print_expr(interner, argument));
            }
            out.push(')');
            out
        }
        Expr::Get { object, name } => format!(
            "(. {} {})",
            print_expr(interner, object),
            interner.resolve(name.lexeme)
        ),
        Expr::Grouping { expression } => {
            parenthesize(interner, "group", &[expression.as_ref()])
        }
        Expr::Literal { value } => match value {
            LiteralValue::Number(num) => format!("{}", num),
            LiteralValue::String(symbol) => interner.resolve(*symbol),
            LiteralValue::Bool(true) => String::from("true"),
            LiteralValue::Bool(false) => String::from("false"),
            LiteralValue::Nil => String::from("nil"),
        },
        Expr::Set {
            object,
            name,
            value,
        } => format!(
            "(.= {} {} {})",
            print_expr(interner, object),
            interner.resolve(name.lexeme),
            print_expr(interner, value)
        ),
        Expr::Super { method, .. } => format!("(super {})", interner.resolve(method.lexeme)),
        Expr::This { .. } => String::from("this"),
        Expr::Unary { operator, right } => parenthesize(
            interner,
            &interner.resolve(operator.lexeme),
            &[right.as_ref()],
        ),
        Expr::Variable(var) => interner.resolve(var.name.lexeme),
    }
}

fn parenthesize(interner: &Interner, name: &str, exprs: &[&Expr]) -> String {
    let mut out = String::from("(");
    out.push_str(name);
    for expr in exprs {
        out.push(' ');
        out.push_str(&print_expr(interner, expr));
    }
    out.push(')');
    out
}
