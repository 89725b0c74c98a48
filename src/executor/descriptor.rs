use std::fmt;
use std::str::Chars;
use std::iter::Peekable;

use crate::executor::error::ResolutionError;
use crate::executor::symbolic_value::Sort;

/// A field or parameter type in descriptor notation (`I`, `J`, `Ljava/lang/String;`, `[D`, ...).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum FieldType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Object(String),
    Array(Box<FieldType>),
}

impl FieldType {
    pub fn parse(descriptor: &str) -> Result<FieldType, ResolutionError> {
        let mut chars = descriptor.chars().peekable();
        let ty = parse_field_type(&mut chars, descriptor)?;
        if chars.next().is_some() {
            return Err(ResolutionError::MalformedDescriptor(descriptor.to_string()));
        }
        Ok(ty)
    }

    /// Computational category the value takes on the operand stack.
    pub fn sort(&self) -> Sort {
        match self {
            FieldType::Boolean
            | FieldType::Byte
            | FieldType::Char
            | FieldType::Short
            | FieldType::Int => Sort::Int32,
            FieldType::Long => Sort::Int64,
            FieldType::Float => Sort::Real32,
            FieldType::Double => Sort::Real64,
            FieldType::Object(_) | FieldType::Array(_) => Sort::Ref,
        }
    }

    pub fn slots(&self) -> usize {
        if self.sort().is_double_word() {
            2
        } else {
            1
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, FieldType::Object(_) | FieldType::Array(_))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Boolean => write!(f, "Z"),
            FieldType::Byte => write!(f, "B"),
            FieldType::Char => write!(f, "C"),
            FieldType::Short => write!(f, "S"),
            FieldType::Int => write!(f, "I"),
            FieldType::Long => write!(f, "J"),
            FieldType::Float => write!(f, "F"),
            FieldType::Double => write!(f, "D"),
            FieldType::Object(name) => write!(f, "L{};", name.replace('.', "/")),
            FieldType::Array(elem) => write!(f, "[{}", elem),
        }
    }
}

fn parse_field_type(
    chars: &mut Peekable<Chars<'_>>,
    whole: &str,
) -> Result<FieldType, ResolutionError> {
    let malformed = || ResolutionError::MalformedDescriptor(whole.to_string());
    match chars.next().ok_or_else(malformed)? {
        'Z' => Ok(FieldType::Boolean),
        'B' => Ok(FieldType::Byte),
        'C' => Ok(FieldType::Char),
        'S' => Ok(FieldType::Short),
        'I' => Ok(FieldType::Int),
        'J' => Ok(FieldType::Long),
        'F' => Ok(FieldType::Float),
        'D' => Ok(FieldType::Double),
        'L' => {
            let mut name = String::new();
            loop {
                match chars.next() {
                    Some(';') => break,
                    Some('/') => name.push('.'),
                    Some(c) => name.push(c),
                    None => return Err(malformed()),
                }
            }
            if name.is_empty() {
                return Err(malformed());
            }
            Ok(FieldType::Object(name))
        }
        '[' => Ok(FieldType::Array(Box::new(parse_field_type(chars, whole)?))),
        _ => Err(malformed()),
    }
}

/// A parsed method descriptor such as `(IJLjava/lang/String;)V`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MethodDescriptor {
    pub params: Vec<FieldType>,
    /// `None` for `V`.
    pub ret: Option<FieldType>,
}

impl MethodDescriptor {
    pub fn parse(descriptor: &str) -> Result<MethodDescriptor, ResolutionError> {
        let malformed = || ResolutionError::MalformedDescriptor(descriptor.to_string());
        let mut chars = descriptor.chars().peekable();
        if chars.next() != Some('(') {
            return Err(malformed());
        }
        let mut params = Vec::new();
        loop {
            match chars.peek() {
                Some(')') => {
                    chars.next();
                    break;
                }
                Some(_) => params.push(parse_field_type(&mut chars, descriptor)?),
                None => return Err(malformed()),
            }
        }
        let ret = if chars.peek() == Some(&'V') {
            chars.next();
            None
        } else {
            Some(parse_field_type(&mut chars, descriptor)?)
        };
        if chars.next().is_some() {
            return Err(malformed());
        }
        Ok(MethodDescriptor { params, ret })
    }

    /// Concrete stack slots taken by the arguments, receiver excluded.
    pub fn param_slots(&self) -> usize {
        self.params.iter().map(|p| p.slots()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_method_descriptor() {
        let d = MethodDescriptor::parse("(IJ[Ljava/lang/String;D)Z").unwrap();
        assert_eq!(d.params.len(), 4);
        assert_eq!(d.params[1], FieldType::Long);
        assert_eq!(
            d.params[2],
            FieldType::Array(Box::new(FieldType::Object("java.lang.String".to_string())))
        );
        assert_eq!(d.ret, Some(FieldType::Boolean));
        assert_eq!(d.param_slots(), 6);
    }

    #[test]
    fn test_void_and_malformed() {
        assert_eq!(MethodDescriptor::parse("()V").unwrap().ret, None);
        assert!(MethodDescriptor::parse("(I").is_err());
        assert!(MethodDescriptor::parse("(Lfoo)V").is_err());
        assert!(FieldType::parse("Q").is_err());
    }
}
