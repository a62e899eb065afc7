use std::collections::HashMap;

use super::placeholder::placeholders;
use crate::error::CoreError;
use crate::template::Template;

/// Expand `template` with positional `args`.
///
/// `args[i]` binds to `template.parameters[i]`. The argument count must match
/// the parameter count exactly, otherwise [`CoreError::Arity`] is returned
/// and nothing is substituted.
///
/// Values are inserted verbatim: no quoting or escaping is applied.
pub fn expand<A: AsRef<str>>(template: &Template, args: &[A]) -> Result<String, CoreError> {
    if args.len() != template.parameters.len() {
        return Err(CoreError::Arity {
            template: template.name.clone(),
            parameters: template.parameters.clone(),
            expected: template.parameters.len(),
            actual: args.len(),
        });
    }

    let bindings: HashMap<&str, &str> = template
        .parameters
        .iter()
        .map(String::as_str)
        .zip(args.iter().map(AsRef::as_ref))
        .collect();
    Ok(substitute(&template.body, &bindings))
}

/// Replace every `$name` in `body` whose name is bound in `bindings`.
///
/// Matching is on whole identifiers, so a binding for `amount` leaves
/// `$amountMax` alone. Unbound placeholders are kept as written. The scan is
/// a single pass over `body`; `$` sequences inside inserted values are never
/// expanded.
pub fn substitute(body: &str, bindings: &HashMap<&str, &str>) -> String {
    let mut out = String::with_capacity(body.len());
    let mut last = 0usize;
    for ph in placeholders(body) {
        if let Some(value) = bindings.get(ph.name) {
            out.push_str(&body[last..ph.start]);
            out.push_str(value);
            last = ph.end;
        }
    }
    out.push_str(&body[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn template(parameters: &[&str], body: &str) -> Template {
        let now = Utc::now();
        Template {
            name: "t".into(),
            parameters: parameters.iter().map(|s| s.to_string()).collect(),
            body: body.into(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn substitutes_every_occurrence() {
        let t = template(&["to", "amt"], "send w c \"f(address,uint256)\" $to $amt # $to");
        assert_eq!(
            expand(&t, &["0xabc", "5"]).unwrap(),
            "send w c \"f(address,uint256)\" 0xabc 5 # 0xabc"
        );
    }

    #[test]
    fn respects_identifier_boundaries() {
        let t = template(&["amount"], "$amount $amountMax $amount_2 x$amount.");
        assert_eq!(
            expand(&t, &["7"]).unwrap(),
            "7 $amountMax $amount_2 x7."
        );
    }

    #[test]
    fn unbound_placeholders_survive() {
        let t = template(&["a"], "$a $b");
        assert_eq!(expand(&t, &["1"]).unwrap(), "1 $b");
    }

    #[test]
    fn values_are_not_reexpanded() {
        let t = template(&["a", "b"], "$a $b");
        assert_eq!(expand(&t, &["$b", "x"]).unwrap(), "$b x");
    }

    #[test]
    fn values_are_inserted_raw() {
        let t = template(&["memo"], "call w c \"m(string)\" $memo");
        assert_eq!(
            expand(&t, &["two words"]).unwrap(),
            "call w c \"m(string)\" two words"
        );
    }

    #[test]
    fn arity_mismatch_fails_both_ways() {
        let t = template(&["a", "b"], "$a $b");
        for args in [vec!["1"], vec!["1", "2", "3"]] {
            match expand(&t, &args) {
                Err(CoreError::Arity {
                    expected, actual, ..
                }) => {
                    assert_eq!(expected, 2);
                    assert_eq!(actual, args.len());
                }
                other => panic!("expected arity error, got {other:?}"),
            }
        }
    }

    #[test]
    fn zero_parameters_with_zero_args() {
        let t = template(&[], "call w c \"ping()\"");
        let no_args: [&str; 0] = [];
        assert_eq!(expand(&t, &no_args).unwrap(), "call w c \"ping()\"");
    }
}
