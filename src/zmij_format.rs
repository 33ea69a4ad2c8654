//! Float literals that are always valid YAML floats (zmij may render `4e-6`, YAML wants `4.0e-6`).

use num_traits::float::FloatCore;
use zmij::Float;

/// Format `f` as a YAML float literal.
///
/// Called by:
/// - `Node::float` and the node serializer.
pub(crate) fn float_literal<F: Float + FloatCore>(f: F) -> String {
    let mut target = String::new();
    push_float_string(&mut target, f);
    target
}

fn push_float_string<F: Float + FloatCore>(target: &mut String, f: F) {
    if f.is_nan() {
        target.push_str(".nan");
    } else if f.is_infinite() {
        if f.is_sign_positive() {
            target.push_str(".inf");
        } else {
            target.push_str("-.inf");
        }
    } else {
        let mut buf = zmij::Buffer::new();
        let s = buf.format_finite(f);
        if s.as_bytes().contains(&b'.') {
            target.push_str(s);
        } else if let Some(exp_pos) = s.find(['e', 'E']) {
            // "4e-6" -> "4.0e-6"
            target.push_str(&s[..exp_pos]);
            target.push_str(".0");
            target.push_str(&s[exp_pos..]);
        } else {
            target.push_str(s);
            target.push_str(".0");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_looks_like_a_float() {
        assert_eq!(float_literal(1.0f64), "1.0");
        assert_eq!(float_literal(2.5f64), "2.5");
        assert_eq!(float_literal(f64::NAN), ".nan");
        assert_eq!(float_literal(f64::NEG_INFINITY), "-.inf");
        let tiny = float_literal(4e-6f64);
        assert!(tiny.contains('.'), "{tiny}");
    }
}
