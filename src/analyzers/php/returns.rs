//! Best-effort inference of a function's return shape.
//!
//! Keys are collected from three sources and unioned:
//!
//! 1. literal arrays returned directly (`return ['id' => …]`), plus the
//!    literal the carrier variable is initialised with;
//! 2. single-key assignments into the carrier (`$r['id'] = …`);
//! 3. two-key assignments into the carrier (`$r['data']['price'] = …`),
//!    which add the parent to the keys and the child to the nested keys.
//!
//! The carrier is the variable of the last `return $var;` in the body. The
//! type is then decided once: array if any key was found, else boolean for a
//! literal `true`/`false` return, else mixed for a bare variable return, else
//! void when nothing is returned, else unknown.

use super::body::FunctionBody;
use crate::core::ReturnType;
use crate::scanner::matching_close;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

static VALUE_RETURN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\breturn\b\s*[^\s;]").expect("valid return regex"));

static CARRIER_RETURN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\breturn\s*\(?\s*\$([A-Za-z_]\w*)\s*\)?\s*;").expect("valid carrier regex")
});

static LITERAL_RETURN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\breturn\s*(?:\[|array\s*\()").expect("valid literal return regex")
});

static BOOLEAN_RETURN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\breturn\s*\(?\s*(?:true|false)\b").expect("valid boolean return regex")
});

static ARRAY_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\w+$").expect("valid key regex"));

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReturnShape {
    pub return_type: ReturnType,
    pub carrier: Option<String>,
    pub keys: BTreeSet<String>,
    pub nested_keys: BTreeMap<String, BTreeSet<String>>,
}

impl ReturnShape {
    fn add_key(&mut self, key: &str) {
        self.keys.insert(key.to_string());
    }

    fn add_nested(&mut self, parent: &str, child: &str) {
        self.add_key(parent);
        self.nested_keys
            .entry(parent.to_string())
            .or_default()
            .insert(child.to_string());
    }
}

pub fn infer_return_shape(body: &FunctionBody<'_>) -> ReturnShape {
    let code = body.own_code.as_str();
    let mut shape = ReturnShape {
        carrier: CARRIER_RETURN
            .captures_iter(code)
            .last()
            .map(|caps| caps[1].to_string()),
        ..ReturnShape::default()
    };

    for m in LITERAL_RETURN.find_iter(code) {
        collect_literal_keys(body, m.end() - 1, &mut shape);
    }

    if let Some(carrier) = shape.carrier.clone() {
        collect_carrier_initializer(body, &carrier, &mut shape);
        collect_carrier_assignments(body, &carrier, &mut shape);
    }

    shape.return_type = if !shape.keys.is_empty() {
        ReturnType::Array
    } else if BOOLEAN_RETURN.is_match(code) {
        ReturnType::Boolean
    } else if shape.carrier.is_some() {
        ReturnType::Mixed
    } else if !VALUE_RETURN.is_match(code) {
        ReturnType::Void
    } else {
        ReturnType::Unknown
    };

    shape
}

fn collect_carrier_initializer(body: &FunctionBody<'_>, carrier: &str, shape: &mut ReturnShape) {
    let pattern = format!(r"(?i)\${}\s*=\s*(?:\[|array\s*\()", regex::escape(carrier));
    let Ok(initializer) = Regex::new(&pattern) else {
        return;
    };
    for m in initializer.find_iter(&body.own_code) {
        collect_literal_keys(body, m.end() - 1, shape);
    }
}

fn collect_carrier_assignments(body: &FunctionBody<'_>, carrier: &str, shape: &mut ReturnShape) {
    let pattern = format!(
        r#"\${}\s*\[\s*['"](\w+)['"]\s*\]\s*(?:\[\s*['"](\w+)['"]\s*\]\s*|\[\s*\]\s*)?(?:[.+\-*/]|\?\?)?=(?:[^=>]|\z)"#,
        regex::escape(carrier)
    );
    let Ok(assignment) = Regex::new(&pattern) else {
        return;
    };
    for caps in assignment.captures_iter(&body.own_stripped) {
        match (caps.get(1), caps.get(2)) {
            (Some(parent), Some(child)) => shape.add_nested(parent.as_str(), child.as_str()),
            (Some(parent), None) => shape.add_key(parent.as_str()),
            _ => {}
        }
    }
}

/// Keys of the array literal opened at `open` (`[` or `(`), walking the
/// masked code so brackets inside strings are ignored. Depth-1 keys are
/// top-level; depth-2 keys are nested under the key whose value opened them.
fn collect_literal_keys(body: &FunctionBody<'_>, open: usize, shape: &mut ReturnShape) {
    let bytes = body.own_code.as_bytes();
    let closer = if bytes.get(open) == Some(&b'[') { b']' } else { b')' };
    let Some(close) = matching_close(bytes, open, bytes.len(), bytes[open], closer) else {
        return;
    };

    let mut parents: Vec<Option<String>> = Vec::new();
    let mut pending_key: Option<String> = None;
    let mut i = open;
    while i <= close {
        if let Some(s) = body.string_at(i) {
            let value = s.literal.value.as_str();
            if followed_by_arrow(bytes, s.end) && ARRAY_KEY.is_match(value) {
                match parents.len() {
                    1 => shape.add_key(value),
                    2 => {
                        if let Some(Some(parent)) = parents.last() {
                            shape.add_nested(parent, value);
                        }
                    }
                    _ => {}
                }
                pending_key = Some(value.to_string());
            }
            i = s.end.max(i + 1);
            continue;
        }
        match bytes[i] {
            b'[' | b'(' => parents.push(pending_key.take()),
            b']' | b')' => {
                parents.pop();
                pending_key = None;
            }
            b',' => pending_key = None,
            _ => {}
        }
        i += 1;
    }
}

fn followed_by_arrow(bytes: &[u8], from: usize) -> bool {
    let mut i = from;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    bytes.get(i..i + 2) == Some(b"=>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::lex_code;
    use pretty_assertions::assert_eq;

    fn shape_of(src: &str) -> ReturnShape {
        let lexed = lex_code(src);
        let body = FunctionBody::new(&lexed, 0..src.len());
        infer_return_shape(&body)
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_carrier_assignments_give_array_keys() {
        let shape = shape_of("{ $result['id'] = 5; $result['name'] = 'x'; return $result; }");
        assert_eq!(shape.return_type, ReturnType::Array);
        assert_eq!(shape.carrier.as_deref(), Some("result"));
        assert_eq!(shape.keys, set(&["id", "name"]));
        assert!(shape.nested_keys.is_empty());
    }

    #[test]
    fn test_nested_assignment() {
        let shape = shape_of("{ $result['data']['price'] = 10; return $result; }");
        assert_eq!(shape.keys, set(&["data"]));
        assert_eq!(shape.nested_keys["data"], set(&["price"]));
    }

    #[test]
    fn test_literal_return_with_nested_literal() {
        let shape = shape_of(
            "{ return array('ok' => true, 'user' => array('id' => $id, 'roles' => ['a', 'b']), 'count' => count($x)); }",
        );
        assert_eq!(shape.return_type, ReturnType::Array);
        assert_eq!(shape.keys, set(&["count", "ok", "user"]));
        assert_eq!(shape.nested_keys["user"], set(&["id", "roles"]));
        assert!(shape.carrier.is_none());
    }

    #[test]
    fn test_literal_and_carrier_keys_are_unioned() {
        let src = "{ if ($e) { return ['error' => $e]; } $out = ['status' => 1]; $out['rows'][] = $r; $out['total'] .= 'x'; return $out; }";
        let shape = shape_of(src);
        assert_eq!(shape.keys, set(&["error", "rows", "status", "total"]));
    }

    #[test]
    fn test_comparisons_are_not_assignments() {
        let shape = shape_of("{ if ($r['id'] == 1) {} foreach ($r['x'] as $k => $v) {} return $r; }");
        assert_eq!(shape.return_type, ReturnType::Mixed);
        assert!(shape.keys.is_empty());
    }

    #[test]
    fn test_type_policy_order() {
        assert_eq!(shape_of("{ return true; }").return_type, ReturnType::Boolean);
        assert_eq!(
            shape_of("{ if ($a) { return FALSE; } return $b; }").return_type,
            ReturnType::Boolean
        );
        assert_eq!(shape_of("{ return $x; }").return_type, ReturnType::Mixed);
        assert_eq!(shape_of("{ echo 1; }").return_type, ReturnType::Void);
        assert_eq!(shape_of("{ if ($a) return; echo 1; }").return_type, ReturnType::Void);
        assert_eq!(shape_of("{ return count($a) + 1; }").return_type, ReturnType::Unknown);
    }

    #[test]
    fn test_last_return_picks_carrier() {
        let shape = shape_of("{ $a['x'] = 1; if ($c) { return $a; } $b['y'] = 2; return $b; }");
        assert_eq!(shape.carrier.as_deref(), Some("b"));
        assert_eq!(shape.keys, set(&["y"]));
    }

    #[test]
    fn test_closure_returns_are_ignored() {
        let shape = shape_of("{ $f = function () { return ['inner' => 1]; }; echo $f(); }");
        assert_eq!(shape.return_type, ReturnType::Void);
        assert!(shape.keys.is_empty());
    }

    #[test]
    fn test_keys_in_comments_are_ignored() {
        let shape = shape_of("{ // $r['old'] = 1;\n $r['new'] = 2; return $r; }");
        assert_eq!(shape.keys, set(&["new"]));
    }
}
