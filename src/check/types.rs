//! The structural type model and its relations.
//!
//! Types are compared structurally: records use width subtyping (extra
//! fields on the source side are fine), string-literal types widen to
//! `string`, and unions accept anything assignable to one member. The
//! error type poisons silently in both directions so that one defect
//! yields one diagnostic.

use std::fmt;

/// A checked type.
#[derive(Debug, Clone, PartialEq)]
pub enum Ty {
    /// `string`
    Str,
    /// `number`
    Num,
    /// `bool`
    Bool,
    /// `void`
    Void,
    /// A string-literal type such as `"e:user.login"`.
    Lit(String),
    /// A record type; field order is declaration order.
    Record(Vec<(String, Ty)>),
    /// A function type.
    Func { params: Vec<Ty>, ret: Box<Ty> },
    /// The built-in event emitter; the inner type is its event map.
    Emitter(Box<Ty>),
    /// A union of alternatives.
    Union(Vec<Ty>),
    /// The poison type produced after reporting a problem.
    Err,
}

impl Ty {
    /// Build a union of two types, flattening nested unions.
    pub fn union_of(lhs: Ty, rhs: Ty) -> Ty {
        let mut members = Vec::new();
        for ty in [lhs, rhs] {
            match ty {
                Ty::Union(inner) => members.extend(inner),
                other => members.push(other),
            }
        }
        members.dedup();
        if members.len() == 1 {
            members.pop().unwrap_or(Ty::Err)
        } else {
            Ty::Union(members)
        }
    }

    /// The union of an event map's literal keys, in declaration order.
    ///
    /// Returns [`Ty::Err`] when the map is not a record.
    pub fn event_key_union(&self) -> Ty {
        match self {
            Ty::Record(fields) => {
                let keys: Vec<Ty> = fields.iter().map(|(k, _)| Ty::Lit(k.clone())).collect();
                match keys.len() {
                    0 => Ty::Union(Vec::new()),
                    1 => keys.into_iter().next().unwrap_or(Ty::Err),
                    _ => Ty::Union(keys),
                }
            }
            _ => Ty::Err,
        }
    }

    /// Look up a field of a record type.
    pub fn field(&self, name: &str) -> Option<&Ty> {
        match self {
            Ty::Record(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, ty)| ty),
            _ => None,
        }
    }
}

/// Intersect two types.
///
/// Records merge their field sets; a key present on both sides is
/// intersected recursively, which is what merges same-key event maps.
/// For non-record combinations the left side wins; errors poison.
pub fn intersect(lhs: Ty, rhs: Ty) -> Ty {
    match (lhs, rhs) {
        (Ty::Err, _) | (_, Ty::Err) => Ty::Err,
        (Ty::Record(mut left), Ty::Record(right)) => {
            for (key, right_ty) in right {
                if let Some(slot) = left.iter_mut().find(|(k, _)| *k == key) {
                    let merged = intersect(std::mem::replace(&mut slot.1, Ty::Err), right_ty);
                    slot.1 = merged;
                } else {
                    left.push((key, right_ty));
                }
            }
            Ty::Record(left)
        }
        (lhs, _) => lhs,
    }
}

/// Whether `src` is assignable to `dst`.
pub fn assignable(src: &Ty, dst: &Ty) -> bool {
    match (src, dst) {
        (Ty::Err, _) | (_, Ty::Err) => true,
        (_, Ty::Union(members)) => members.iter().any(|m| assignable(src, m)),
        (Ty::Union(members), _) => members.iter().all(|m| assignable(m, dst)),
        (Ty::Lit(a), Ty::Lit(b)) => a == b,
        (Ty::Lit(_), Ty::Str) => true,
        (Ty::Record(src_fields), Ty::Record(dst_fields)) => {
            dst_fields.iter().all(|(key, dst_ty)| {
                src_fields
                    .iter()
                    .find(|(k, _)| k == key)
                    .is_some_and(|(_, src_ty)| assignable(src_ty, dst_ty))
            })
        }
        (
            Ty::Func {
                params: src_params,
                ret: src_ret,
            },
            Ty::Func {
                params: dst_params,
                ret: dst_ret,
            },
        ) => {
            src_params.len() == dst_params.len()
                // Parameters check contravariantly.
                && src_params
                    .iter()
                    .zip(dst_params.iter())
                    .all(|(s, d)| assignable(d, s))
                // A void-returning destination accepts any return type.
                && (matches!(**dst_ret, Ty::Void) || assignable(src_ret, dst_ret))
        }
        (Ty::Emitter(a), Ty::Emitter(b)) => a == b,
        (a, b) => a == b,
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Str => write!(f, "string"),
            Ty::Num => write!(f, "number"),
            Ty::Bool => write!(f, "bool"),
            Ty::Void => write!(f, "void"),
            Ty::Lit(value) => write!(f, "\"{value}\""),
            Ty::Record(fields) => {
                if fields.is_empty() {
                    return write!(f, "{{}}");
                }
                write!(f, "{{ ")?;
                for (i, (key, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if is_bare_key(key) {
                        write!(f, "{key}: {ty}")?;
                    } else {
                        write!(f, "\"{key}\": {ty}")?;
                    }
                }
                write!(f, " }}")
            }
            Ty::Func { params, ret } => {
                write!(f, "(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ") -> {ret}")
            }
            Ty::Emitter(map) => write!(f, "Emitter<{map}>"),
            Ty::Union(members) => {
                if members.is_empty() {
                    return write!(f, "never");
                }
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{member}")?;
                }
                Ok(())
            }
            Ty::Err => write!(f, "{{unknown}}"),
        }
    }
}

/// Whether a record key can be displayed without quotes.
fn is_bare_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !key.starts_with(|c: char| c.is_ascii_digit())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[(&str, Ty)]) -> Ty {
        Ty::Record(
            fields
                .iter()
                .map(|(k, t)| ((*k).to_owned(), t.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_intersect_merges_disjoint_fields() {
        let a = record(&[("token", Ty::Str)]);
        let b = record(&[("count", Ty::Num)]);
        assert_eq!(
            intersect(a, b),
            record(&[("token", Ty::Str), ("count", Ty::Num)])
        );
    }

    #[test]
    fn test_intersect_merges_shared_keys_recursively() {
        // Two event maps declaring the same key merge its payload fields.
        let a = record(&[(
            "e:user.save",
            record(&[("user", record(&[("firstName", Ty::Str), ("lastName", Ty::Str)]))]),
        )]);
        let b = record(&[(
            "e:user.save",
            record(&[("user", record(&[("username", Ty::Str)])), ("roles", Ty::Num)]),
        )]);

        let merged = intersect(a, b);
        let payload = merged.field("e:user.save").unwrap();
        let user = payload.field("user").unwrap();
        assert!(user.field("firstName").is_some());
        assert!(user.field("lastName").is_some());
        assert!(user.field("username").is_some());
        assert!(payload.field("roles").is_some());
    }

    #[test]
    fn test_intersect_poisons_on_error() {
        assert_eq!(intersect(Ty::Err, record(&[])), Ty::Err);
        assert_eq!(intersect(record(&[]), Ty::Err), Ty::Err);
    }

    #[test]
    fn test_assignable_literal_widening() {
        assert!(assignable(&Ty::Lit("a".into()), &Ty::Str));
        assert!(assignable(&Ty::Lit("a".into()), &Ty::Lit("a".into())));
        assert!(!assignable(&Ty::Lit("a".into()), &Ty::Lit("b".into())));
        assert!(!assignable(&Ty::Str, &Ty::Lit("a".into())));
    }

    #[test]
    fn test_assignable_union_membership() {
        let keys = Ty::Union(vec![Ty::Lit("a".into()), Ty::Lit("b".into())]);
        assert!(assignable(&Ty::Lit("a".into()), &keys));
        assert!(!assignable(&Ty::Lit("c".into()), &keys));
    }

    #[test]
    fn test_assignable_record_width_subtyping() {
        let wide = record(&[("a", Ty::Str), ("b", Ty::Num)]);
        let narrow = record(&[("a", Ty::Str)]);
        assert!(assignable(&wide, &narrow));
        assert!(!assignable(&narrow, &wide));
        // The empty record literal satisfies nothing with required fields.
        assert!(!assignable(&record(&[]), &narrow));
    }

    #[test]
    fn test_assignable_function_void_return() {
        let returns_num = Ty::Func {
            params: vec![],
            ret: Box::new(Ty::Num),
        };
        let wants_void = Ty::Func {
            params: vec![],
            ret: Box::new(Ty::Void),
        };
        assert!(assignable(&returns_num, &wants_void));
        assert!(!assignable(&wants_void, &returns_num));
    }

    #[test]
    fn test_error_poisons_both_ways() {
        assert!(assignable(&Ty::Err, &Ty::Str));
        assert!(assignable(&Ty::Str, &Ty::Err));
    }

    #[test]
    fn test_event_key_union_in_declaration_order() {
        let map = record(&[("e:a", Ty::Void), ("e:b", Ty::Void)]);
        assert_eq!(map.event_key_union().to_string(), "\"e:a\" | \"e:b\"");
    }

    #[test]
    fn test_display() {
        assert_eq!(record(&[]).to_string(), "{}");
        assert_eq!(
            record(&[("token", Ty::Str)]).to_string(),
            "{ token: string }"
        );
        assert_eq!(
            record(&[("e:user.login", record(&[("token", Ty::Str)]))]).to_string(),
            "{ \"e:user.login\": { token: string } }"
        );
        assert_eq!(
            Ty::Func {
                params: vec![Ty::Str],
                ret: Box::new(Ty::Void),
            }
            .to_string(),
            "(string) -> void"
        );
    }

    #[test]
    fn test_union_of_flattens_and_dedups() {
        let ab = Ty::union_of(Ty::Lit("a".into()), Ty::Lit("b".into()));
        let abc = Ty::union_of(ab, Ty::Lit("c".into()));
        assert_eq!(abc.to_string(), "\"a\" | \"b\" | \"c\"");

        let single = Ty::union_of(Ty::Str, Ty::Str);
        assert_eq!(single, Ty::Str);
    }
}
