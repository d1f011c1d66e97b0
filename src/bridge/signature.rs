//=====================================================
// File: bridge/signature.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Wire-level type signatures
// Objective: Encode type descriptors into the host's compact signature
//            alphabet and decode them back
//=====================================================

use thiserror::Error;

use crate::host::{PrimitiveKind, TypeDescriptor};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("empty signature")]
    Empty,
    #[error("unknown type code '{code}' at offset {offset}")]
    UnknownCode { code: char, offset: usize },
    #[error("unterminated class name starting at offset {offset}")]
    UnterminatedClass { offset: usize },
    #[error("trailing input after offset {offset}")]
    TrailingInput { offset: usize },
    #[error("malformed method signature: {0}")]
    MalformedMethod(String),
}

fn primitive_code(kind: PrimitiveKind) -> char {
    match kind {
        PrimitiveKind::Void => 'V',
        PrimitiveKind::Boolean => 'Z',
        PrimitiveKind::Byte => 'B',
        PrimitiveKind::Short => 'S',
        PrimitiveKind::Int => 'I',
        PrimitiveKind::Long => 'J',
        PrimitiveKind::Float => 'F',
        PrimitiveKind::Double => 'D',
        PrimitiveKind::Char => 'C',
    }
}

fn primitive_for_code(code: char) -> Option<PrimitiveKind> {
    PrimitiveKind::ALL
        .into_iter()
        .find(|kind| primitive_code(*kind) == code)
}

/// Encode a single type, e.g. `int[]` -> `[I`, `java.lang.String` -> `Ljava/lang/String;`.
pub fn encode(ty: &TypeDescriptor) -> String {
    let mut out = String::new();
    encode_into(ty, &mut out);
    out
}

fn encode_into(ty: &TypeDescriptor, out: &mut String) {
    match ty {
        TypeDescriptor::Primitive(kind) => out.push(primitive_code(*kind)),
        TypeDescriptor::Array(component) => {
            out.push('[');
            encode_into(component, out);
        }
        TypeDescriptor::Class(name) => {
            out.push('L');
            out.push_str(&name.replace('.', "/"));
            out.push(';');
        }
    }
}

/// `(<params>)<ret>` for a method or constructor.
pub fn method_signature(params: &[TypeDescriptor], return_type: &TypeDescriptor) -> String {
    let mut out = String::from("(");
    for param in params {
        encode_into(param, &mut out);
    }
    out.push(')');
    encode_into(return_type, &mut out);
    out
}

/// Decode exactly one type from `signature`.
pub fn decode(signature: &str) -> Result<TypeDescriptor, SignatureError> {
    if signature.is_empty() {
        return Err(SignatureError::Empty);
    }
    let chars: Vec<char> = signature.chars().collect();
    let mut offset = 0;
    let ty = decode_at(&chars, &mut offset)?;
    if offset != chars.len() {
        return Err(SignatureError::TrailingInput { offset });
    }
    Ok(ty)
}

/// Decode a `(<params>)<ret>` method signature.
pub fn decode_method(
    signature: &str,
) -> Result<(Vec<TypeDescriptor>, TypeDescriptor), SignatureError> {
    let chars: Vec<char> = signature.chars().collect();
    if chars.first() != Some(&'(') {
        return Err(SignatureError::MalformedMethod(signature.to_string()));
    }
    let mut offset = 1;
    let mut params = Vec::new();
    loop {
        match chars.get(offset) {
            Some(')') => {
                offset += 1;
                break;
            }
            Some(_) => params.push(decode_at(&chars, &mut offset)?),
            None => return Err(SignatureError::MalformedMethod(signature.to_string())),
        }
    }
    if offset >= chars.len() {
        return Err(SignatureError::MalformedMethod(signature.to_string()));
    }
    let return_type = decode_at(&chars, &mut offset)?;
    if offset != chars.len() {
        return Err(SignatureError::TrailingInput { offset });
    }
    Ok((params, return_type))
}

fn decode_at(chars: &[char], offset: &mut usize) -> Result<TypeDescriptor, SignatureError> {
    let start = *offset;
    let code = *chars.get(start).ok_or(SignatureError::Empty)?;
    *offset += 1;
    match code {
        '[' => Ok(TypeDescriptor::array_of(decode_at(chars, offset)?)),
        'L' => {
            let end = chars[*offset..]
                .iter()
                .position(|c| *c == ';')
                .map(|len| *offset + len)
                .ok_or(SignatureError::UnterminatedClass { offset: start })?;
            if end == *offset {
                return Err(SignatureError::UnterminatedClass { offset: start });
            }
            let name: String = chars[*offset..end].iter().collect();
            *offset = end + 1;
            Ok(TypeDescriptor::Class(name.replace('/', ".")))
        }
        other => primitive_for_code(other)
            .map(TypeDescriptor::Primitive)
            .ok_or(SignatureError::UnknownCode {
                code: other,
                offset: start,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_primitive_alphabet() {
        let codes: String = PrimitiveKind::ALL
            .into_iter()
            .map(|kind| encode(&TypeDescriptor::Primitive(kind)))
            .collect();
        assert_eq!(codes, "VZBSIJFDC");
    }

    #[test]
    fn encodes_nested_arrays_and_classes() {
        let ty = TypeDescriptor::array_of(TypeDescriptor::array_of(TypeDescriptor::string()));
        assert_eq!(encode(&ty), "[[Ljava/lang/String;");
        assert_eq!(decode("[[Ljava/lang/String;").expect("decode"), ty);
    }

    #[test]
    fn method_signature_concatenates_params() {
        let params = vec![
            TypeDescriptor::Primitive(PrimitiveKind::Int),
            TypeDescriptor::string(),
            TypeDescriptor::array_of(TypeDescriptor::Primitive(PrimitiveKind::Double)),
        ];
        let ret = TypeDescriptor::void();
        let signature = method_signature(&params, &ret);
        assert_eq!(signature, "(ILjava/lang/String;[D)V");
        let (decoded, decoded_ret) = decode_method(&signature).expect("decode method");
        assert_eq!(decoded, params);
        assert_eq!(decoded_ret, ret);
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(decode(""), Err(SignatureError::Empty));
        assert!(matches!(decode("Q"), Err(SignatureError::UnknownCode { code: 'Q', .. })));
        assert!(matches!(
            decode("Ljava/lang/String"),
            Err(SignatureError::UnterminatedClass { .. })
        ));
        assert!(matches!(decode("II"), Err(SignatureError::TrailingInput { offset: 1 })));
        assert!(matches!(decode_method("I)V"), Err(SignatureError::MalformedMethod(_))));
        assert!(matches!(decode_method("(I"), Err(SignatureError::MalformedMethod(_))));
    }
}

//=====================================================
// End of file
//=====================================================
