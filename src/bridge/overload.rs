//=====================================================
// File: bridge/overload.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Overload tables and first-match resolution
// Objective: Group introspected methods by name in discovery order and pick
//            the first overload whose parameters accept every argument
//=====================================================

use super::signature;
use super::CoercionError;
use crate::host::{HostValue, MethodDescriptor, TypeDescriptor};
use crate::script::value::Value;

/// Methods grouped by name. Names keep first-appearance order and overloads
/// keep discovery order.
#[derive(Debug, Clone, Default)]
pub struct MethodTable {
    entries: Vec<(String, Vec<MethodDescriptor>)>,
}

impl MethodTable {
    pub fn from_methods(methods: impl IntoIterator<Item = MethodDescriptor>) -> Self {
        let mut table = Self::default();
        for method in methods {
            table.push(method);
        }
        table
    }

    pub fn push(&mut self, method: MethodDescriptor) {
        match self.entries.iter_mut().find(|(name, _)| *name == method.name) {
            Some((_, overloads)) => overloads.push(method),
            None => self.entries.push((method.name.clone(), vec![method])),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[MethodDescriptor]> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, overloads)| overloads.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One line per overload, like a docstring listing.
    pub fn describe(&self, name: &str) -> Option<String> {
        self.get(name).map(|overloads| {
            overloads
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n")
        })
    }
}

/// The overload chosen for a call and its converted arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<'a> {
    pub index: usize,
    pub descriptor: &'a MethodDescriptor,
    pub args: Vec<HostValue>,
    pub signature: String,
}

/// Walk `candidates` in order and return the first one every argument coerces to.
///
/// Candidates failing the arity filters are skipped silently. A variable-arity
/// candidate receives its trailing arguments packed into one list; with no
/// parameter to pack into it takes no arguments at all. A failed
/// coercion is remembered and reported as `last` when nothing matches.
pub fn resolve<'a, F>(
    name: &str,
    args: &[Value],
    candidates: &'a [MethodDescriptor],
    mut coerce_fn: F,
) -> Result<Resolved<'a>, CoercionError>
where
    F: FnMut(&Value, &TypeDescriptor) -> Result<HostValue, CoercionError>,
{
    let mut last = None;
    'candidates: for (index, candidate) in candidates.iter().enumerate() {
        let params = &candidate.params;
        let packs = candidate.var_args && !params.is_empty();
        let required = params.len() - usize::from(packs);
        if args.len() < required {
            continue;
        }
        if args.len() > params.len() && !packs {
            continue;
        }

        let packed;
        let effective: &[Value] = if packs {
            let mut repacked = args[..required].to_vec();
            repacked.push(Value::list(args[required..].to_vec()));
            packed = repacked;
            &packed
        } else {
            args
        };

        let mut converted = Vec::with_capacity(params.len());
        for (arg, param) in effective.iter().zip(params) {
            match coerce_fn(arg, param) {
                Ok(value) => converted.push(value),
                Err(err) => {
                    last = Some(Box::new(err));
                    continue 'candidates;
                }
            }
        }

        let return_type = if candidate.is_constructor() {
            TypeDescriptor::void()
        } else {
            candidate.return_type.clone()
        };
        return Ok(Resolved {
            index,
            descriptor: candidate,
            args: converted,
            signature: signature::method_signature(params, &return_type),
        });
    }

    Err(CoercionError::NoMatchingOverload {
        name: name.to_string(),
        last,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::coerce;
    use crate::host::{InMemoryHost, PrimitiveKind};

    fn prim(kind: PrimitiveKind) -> TypeDescriptor {
        TypeDescriptor::Primitive(kind)
    }

    fn max_overloads() -> Vec<MethodDescriptor> {
        [PrimitiveKind::Int, PrimitiveKind::Long, PrimitiveKind::Double]
            .into_iter()
            .map(|kind| MethodDescriptor::new("max", vec![prim(kind), prim(kind)], prim(kind)))
            .collect()
    }

    #[test]
    fn table_keeps_discovery_order() {
        let table = MethodTable::from_methods(vec![
            MethodDescriptor::new("b", vec![], TypeDescriptor::void()),
            MethodDescriptor::new("a", vec![], TypeDescriptor::void()),
            MethodDescriptor::new("b", vec![prim(PrimitiveKind::Int)], TypeDescriptor::void()),
        ]);
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(table.get("b").map(<[_]>::len), Some(2));
        assert_eq!(
            table.describe("b").expect("describe"),
            "void b()\nvoid b(int)"
        );
    }

    #[test]
    fn first_coercible_overload_wins() {
        let host = InMemoryHost::new();
        let candidates = max_overloads();
        let ints = resolve("max", &[Value::Int(1), Value::Int(2)], &candidates, |v, t| {
            coerce(&host, v, t)
        })
        .expect("int overload");
        assert_eq!(ints.index, 0);
        assert_eq!(ints.signature, "(II)I");

        let doubles = resolve("max", &[Value::Int(1), Value::Float(2.5)], &candidates, |v, t| {
            coerce(&host, v, t)
        })
        .expect("double overload");
        assert_eq!(doubles.index, 2);
        assert_eq!(doubles.args, vec![HostValue::Double(1.0), HostValue::Double(2.5)]);
    }

    #[test]
    fn declaration_order_beats_specificity() {
        let host = InMemoryHost::new();
        let candidates = vec![
            MethodDescriptor::new("f", vec![TypeDescriptor::object()], TypeDescriptor::void()),
            MethodDescriptor::new("f", vec![TypeDescriptor::string()], TypeDescriptor::void()),
        ];
        let resolved = resolve("f", &[Value::str("x")], &candidates, |v, t| coerce(&host, v, t))
            .expect("resolve");
        assert_eq!(resolved.index, 0);

        let reversed: Vec<_> = candidates.into_iter().rev().collect();
        let resolved = resolve("f", &[Value::str("x")], &reversed, |v, t| coerce(&host, v, t))
            .expect("resolve");
        assert_eq!(resolved.descriptor.params[0], TypeDescriptor::string());
    }

    #[test]
    fn var_args_pack_trailing_arguments() {
        let candidates = vec![MethodDescriptor::new(
            "join",
            vec![
                TypeDescriptor::string(),
                TypeDescriptor::array_of(TypeDescriptor::object()),
            ],
            TypeDescriptor::string(),
        )
        .with_var_args()];
        let mut seen = Vec::new();
        let args = [Value::str("-"), Value::Int(1), Value::Int(2), Value::Int(3)];
        let resolved = resolve("join", &args, &candidates, |value, _| {
            seen.push(value.repr());
            Ok(HostValue::Null)
        })
        .expect("var-args");
        assert_eq!(resolved.args.len(), 2);
        assert_eq!(seen, vec!["'-'".to_string(), "[1, 2, 3]".to_string()]);

        let mut packed_empty = None;
        resolve("join", &[Value::str("-")], &candidates, |value, _| {
            packed_empty = Some(value.repr());
            Ok(HostValue::Null)
        })
        .expect("no trailing args");
        assert_eq!(packed_empty.as_deref(), Some("[]"));
    }

    #[test]
    fn fixed_arity_overload_precedes_var_args_sibling() {
        let host = InMemoryHost::new();
        let int = prim(PrimitiveKind::Int);
        let candidates = vec![
            MethodDescriptor::new("f", vec![int.clone()], TypeDescriptor::string()),
            MethodDescriptor::new(
                "f",
                vec![int.clone(), TypeDescriptor::array_of(int.clone())],
                TypeDescriptor::string(),
            )
            .with_var_args(),
        ];
        let single = resolve("f", &[Value::Int(1)], &candidates, |v, t| coerce(&host, v, t))
            .expect("fixed overload");
        assert_eq!(single.index, 0);

        let many = [Value::Int(1), Value::Int(2), Value::Int(3)];
        let packed = resolve("f", &many, &candidates, |v, t| coerce(&host, v, t))
            .expect("var-args overload");
        assert_eq!(packed.index, 1);
        assert_eq!(packed.args.len(), 2);
    }

    #[test]
    fn var_args_flag_without_parameters_accepts_no_arguments() {
        let candidates =
            vec![MethodDescriptor::new("ping", vec![], TypeDescriptor::void()).with_var_args()];
        let resolved = resolve("ping", &[], &candidates, |_, _| Ok(HostValue::Null))
            .expect("empty call");
        assert!(resolved.args.is_empty());

        match resolve("ping", &[Value::Int(1)], &candidates, |_, _| Ok(HostValue::Null)) {
            Err(CoercionError::NoMatchingOverload { last, .. }) => assert!(last.is_none()),
            other => panic!("unexpected resolution: {other:?}"),
        }
    }

    #[test]
    fn arity_mismatches_report_no_match_without_cause() {
        let candidates = max_overloads();
        match resolve("max", &[Value::Int(1)], &candidates, |_, _| Ok(HostValue::Null)) {
            Err(CoercionError::NoMatchingOverload { name, last }) => {
                assert_eq!(name, "max");
                assert!(last.is_none());
            }
            other => panic!("unexpected resolution: {other:?}"),
        }
    }

    #[test]
    fn last_coercion_failure_is_kept() {
        let host = InMemoryHost::new();
        let candidates = max_overloads();
        let err = resolve("max", &[Value::str("a"), Value::Int(1)], &candidates, |v, t| {
            coerce(&host, v, t)
        })
        .expect_err("strings never match");
        match err {
            CoercionError::NoMatchingOverload {
                last: Some(last), ..
            } => assert!(matches!(*last, CoercionError::NoCoercionRule { ref signature } if signature == "D")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

//=====================================================
// End of file
//=====================================================
