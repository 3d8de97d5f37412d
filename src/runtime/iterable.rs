//! Normalization of loop sources into a single (key, value) pair protocol.
//!
//! The source kind is inspected once, when the stream is built; afterwards
//! the loop engine only ever sees [`Pair`]s.

use crate::runtime::value::{RangeValue, Value};
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq)]
pub struct Pair {
    pub key: Value,
    pub value: Value,
}

/// Lazy, finite, non-restartable stream of loop pairs.
pub enum PairStream {
    Sequence {
        items: Rc<Vec<Value>>,
        position: usize,
    },
    Mapping {
        entries: Rc<BTreeMap<String, Value>>,
        keys: std::vec::IntoIter<String>,
    },
    Generator {
        next: i64,
        end: i64,
        ordinal: i64,
    },
}

/// The source value could not be iterated; carries the offending type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotIterable(pub &'static str);

pub fn normalize(value: Value) -> Result<PairStream, NotIterable> {
    match value {
        Value::Array(items) => Ok(sequence(items)),
        Value::Map(entries) => Ok(mapping(entries)),
        Value::Range(range) => Ok(generator(range)),
        other => Err(NotIterable(other.type_name())),
    }
}

fn sequence(items: Rc<Vec<Value>>) -> PairStream {
    PairStream::Sequence { items, position: 0 }
}

fn mapping(entries: Rc<BTreeMap<String, Value>>) -> PairStream {
    let keys: Vec<String> = entries.keys().cloned().collect();
    PairStream::Mapping {
        entries,
        keys: keys.into_iter(),
    }
}

fn generator(range: RangeValue) -> PairStream {
    PairStream::Generator {
        next: range.start,
        end: range.end,
        ordinal: 0,
    }
}

impl Iterator for PairStream {
    type Item = Pair;

    fn next(&mut self) -> Option<Pair> {
        match self {
            PairStream::Sequence { items, position } => {
                let value = items.get(*position)?.clone();
                let key = Value::Int(i64::try_from(*position).ok()?);
                *position += 1;
                Some(Pair { key, value })
            }
            PairStream::Mapping { entries, keys } => {
                let key = keys.next()?;
                let value = entries.get(&key).cloned().unwrap_or(Value::Nil);
                Some(Pair {
                    key: Value::String(key),
                    value,
                })
            }
            PairStream::Generator { next, end, ordinal } => {
                if *next >= *end {
                    return None;
                }
                let pair = Pair {
                    key: Value::Int(*ordinal),
                    value: Value::Int(*next),
                };
                *next += 1;
                *ordinal += 1;
                Some(pair)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match self {
            PairStream::Sequence { items, position } => items.len().saturating_sub(*position),
            PairStream::Mapping { keys, .. } => keys.len(),
            PairStream::Generator { next, end, .. } => RangeValue::new(*next, *end).len(),
        };
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pairs(value: Value) -> Vec<(Value, Value)> {
        normalize(value)
            .expect("value should be iterable")
            .map(|pair| (pair.key, pair.value))
            .collect()
    }

    #[test]
    fn sequence_keys_are_positions() {
        assert_eq!(
            pairs(Value::array(["a", "b"])),
            vec![
                (Value::Int(0), Value::from("a")),
                (Value::Int(1), Value::from("b")),
            ]
        );
    }

    #[test]
    fn mapping_keys_are_strings() {
        let mut got = pairs(Value::map([("b", 2), ("a", 1)]));
        got.sort_by_key(|(key, _)| key.to_string());
        assert_eq!(
            got,
            vec![
                (Value::from("a"), Value::Int(1)),
                (Value::from("b"), Value::Int(2)),
            ]
        );
    }

    #[test]
    fn generator_keys_are_ordinals() {
        assert_eq!(
            pairs(Value::Range(RangeValue::new(3, 6))),
            vec![
                (Value::Int(0), Value::Int(3)),
                (Value::Int(1), Value::Int(4)),
                (Value::Int(2), Value::Int(5)),
            ]
        );
    }

    #[test]
    fn empty_sources_yield_nothing() {
        assert!(pairs(Value::array(Vec::<Value>::new())).is_empty());
        assert!(pairs(Value::map(Vec::<(String, Value)>::new())).is_empty());
        assert!(pairs(Value::Range(RangeValue::new(4, 4))).is_empty());
    }

    #[test]
    fn nil_and_scalars_are_not_iterable() {
        assert_eq!(normalize(Value::Nil).err(), Some(NotIterable("nil")));
        assert_eq!(normalize(Value::Int(3)).err(), Some(NotIterable("int")));
        assert_eq!(normalize(Value::from("abc")).err(), Some(NotIterable("string")));
    }

    #[test]
    fn wide_generator_reports_saturated_size() {
        let mut stream =
            normalize(Value::Range(RangeValue::new(i64::MIN, i64::MAX))).expect("iterable");
        let (lower, upper) = stream.size_hint();
        assert_eq!(lower, usize::try_from(u64::MAX).unwrap_or(usize::MAX));
        assert_eq!(upper, Some(lower));
        assert_eq!(
            stream.next(),
            Some(Pair {
                key: Value::Int(0),
                value: Value::Int(i64::MIN),
            })
        );
    }

    #[test]
    fn stream_is_not_restartable() {
        let mut stream = normalize(Value::array([1])).expect("iterable");
        assert_eq!(stream.size_hint(), (1, Some(1)));
        assert!(stream.next().is_some());
        assert!(stream.next().is_none());
        assert!(stream.next().is_none());
    }
}
