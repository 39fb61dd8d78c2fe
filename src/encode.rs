use crate::error::Error;
use std::any::{Any, TypeId};

/// Encodes a value of a declared source type to a `String` for a text
/// send (spec §4.9 "Text encoder").
pub trait TextEncoder<T>: Send + Sync {
    fn encode(&self, value: &T) -> Result<String, Error>;
}

/// Encodes a value by writing characters to a [`crate::adapters::CharSendWriter`]
/// (spec §4.9 "TextStream encoder").
pub trait TextStreamEncoder<T>: Send + Sync {
    fn encode_to(&self, value: &T, out: &mut String) -> Result<(), Error>;
}

/// Encodes a value to a byte buffer for a binary send (spec §4.9 "BinaryBuffer encoder").
pub trait BinaryEncoder<T>: Send + Sync {
    fn encode(&self, value: &T) -> Result<Vec<u8>, Error>;
}

/// Encodes a value by writing bytes to a [`crate::adapters::ByteSendStream`]
/// (spec §4.9 "BinaryStream encoder").
pub trait BinaryStreamEncoder<T>: Send + Sync {
    fn encode_to(&self, value: &T, out: &mut Vec<u8>) -> Result<(), Error>;
}

/// What a matched encoder does with the value once dispatch has picked it
/// (spec §4.9 step 2). `TextStream`/`BinaryStream` encoders still write
/// progressively into a scratch `String`/`Vec<u8>` under dispatch's control
/// ("acquire a Writer/OutputStream, call encoder, close under guaranteed
/// release", spec §4.9), but the scratch buffer is handed back here the same
/// way a plain `Text`/`BinaryBuffer` encoder's result is, since the caller
/// sends it on as a single (possibly fragmented) message either way.
pub enum EncodeOutcome {
    Text(String),
    Binary(Vec<u8>),
}

type DynTextEncoder = Box<dyn Fn(&dyn Any) -> Result<String, Error> + Send + Sync>;
type DynBinaryEncoder = Box<dyn Fn(&dyn Any) -> Result<Vec<u8>, Error> + Send + Sync>;
type DynTextStreamEncoder = Box<dyn Fn(&dyn Any, &mut String) -> Result<(), Error> + Send + Sync>;
type DynBinaryStreamEncoder = Box<dyn Fn(&dyn Any, &mut Vec<u8>) -> Result<(), Error> + Send + Sync>;

enum EncoderFn {
    Text(DynTextEncoder),
    TextStream(DynTextStreamEncoder),
    Binary(DynBinaryEncoder),
    BinaryStream(DynBinaryStreamEncoder),
}

/// One registered user encoder: the declared source type plus the encoder
/// instance (spec §3 `EncoderEntry`). Order is significant — dispatch
/// walks entries in insertion order and the first whose declared type
/// matches wins, never the most specific match (spec §4.9/§9, preserved
/// verbatim per DESIGN.md's Open Question decision).
pub struct EncoderEntry {
    type_id: TypeId,
    encoder: EncoderFn,
}

impl EncoderEntry {
    pub fn text<T: Any>(encoder: impl TextEncoder<T> + 'static) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            encoder: EncoderFn::Text(Box::new(move |value| {
                let value = value.downcast_ref::<T>().expect("type_id matched");
                encoder.encode(value)
            })),
        }
    }

    pub fn text_stream<T: Any>(encoder: impl TextStreamEncoder<T> + 'static) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            encoder: EncoderFn::TextStream(Box::new(move |value, out| {
                let value = value.downcast_ref::<T>().expect("type_id matched");
                encoder.encode_to(value, out)
            })),
        }
    }

    pub fn binary<T: Any>(encoder: impl BinaryEncoder<T> + 'static) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            encoder: EncoderFn::Binary(Box::new(move |value| {
                let value = value.downcast_ref::<T>().expect("type_id matched");
                encoder.encode(value)
            })),
        }
    }

    pub fn binary_stream<T: Any>(encoder: impl BinaryStreamEncoder<T> + 'static) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            encoder: EncoderFn::BinaryStream(Box::new(move |value, out| {
                let value = value.downcast_ref::<T>().expect("type_id matched");
                encoder.encode_to(value, out)
            })),
        }
    }
}

/// Walks `entries` for the first encoder whose declared type matches
/// `value`'s concrete type, and runs it (spec §4.9 step 2).
pub fn dispatch(entries: &[EncoderEntry], value: &dyn Any) -> Result<EncodeOutcome, Error> {
    let type_id = value.type_id();
    for entry in entries {
        if entry.type_id != type_id {
            continue;
        }
        return match &entry.encoder {
            EncoderFn::Text(f) => Ok(EncodeOutcome::Text(f(value)?)),
            EncoderFn::Binary(f) => Ok(EncodeOutcome::Binary(f(value)?)),
            EncoderFn::TextStream(f) => {
                let mut out = String::new();
                f(value, &mut out)?;
                Ok(EncodeOutcome::Text(out))
            }
            EncoderFn::BinaryStream(f) => {
                let mut out = Vec::new();
                f(value, &mut out)?;
                Ok(EncodeOutcome::Binary(out))
            }
        };
    }
    Err(Error::NoEncoderMatched)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Point {
        x: i32,
        y: i32,
    }

    struct PointEncoder;
    impl TextEncoder<Point> for PointEncoder {
        fn encode(&self, value: &Point) -> Result<String, Error> {
            Ok(format!("{},{}", value.x, value.y))
        }
    }

    #[test]
    fn first_matching_encoder_wins() {
        struct AlwaysA;
        impl TextEncoder<Point> for AlwaysA {
            fn encode(&self, _value: &Point) -> Result<String, Error> {
                Ok("a".to_string())
            }
        }
        let entries = vec![EncoderEntry::text(AlwaysA), EncoderEntry::text(PointEncoder)];
        let outcome = dispatch(&entries, &Point { x: 1, y: 2 }).unwrap();
        match outcome {
            EncodeOutcome::Text(s) => assert_eq!(s, "a"),
            _ => panic!("expected text"),
        }
    }

    struct PointTextStreamEncoder;
    impl TextStreamEncoder<Point> for PointTextStreamEncoder {
        fn encode_to(&self, value: &Point, out: &mut String) -> Result<(), Error> {
            out.push_str(&format!("{},{}", value.x, value.y));
            Ok(())
        }
    }

    struct PointBinaryEncoder;
    impl BinaryEncoder<Point> for PointBinaryEncoder {
        fn encode(&self, value: &Point) -> Result<Vec<u8>, Error> {
            Ok(vec![value.x as u8, value.y as u8])
        }
    }

    struct PointBinaryStreamEncoder;
    impl BinaryStreamEncoder<Point> for PointBinaryStreamEncoder {
        fn encode_to(&self, value: &Point, out: &mut Vec<u8>) -> Result<(), Error> {
            out.push(value.x as u8);
            out.push(value.y as u8);
            Ok(())
        }
    }

    #[test]
    fn text_stream_encoder_dispatches_to_text() {
        let entries = vec![EncoderEntry::text_stream(PointTextStreamEncoder)];
        let outcome = dispatch(&entries, &Point { x: 3, y: 4 }).unwrap();
        match outcome {
            EncodeOutcome::Text(s) => assert_eq!(s, "3,4"),
            _ => panic!("expected text"),
        }
    }

    #[test]
    fn binary_stream_encoder_dispatches_to_binary() {
        let entries = vec![EncoderEntry::binary_stream(PointBinaryStreamEncoder)];
        let outcome = dispatch(&entries, &Point { x: 3, y: 4 }).unwrap();
        match outcome {
            EncodeOutcome::Binary(b) => assert_eq!(b, vec![3, 4]),
            _ => panic!("expected binary"),
        }
    }

    #[test]
    fn binary_buffer_encoder_still_dispatches_to_binary() {
        let entries = vec![EncoderEntry::binary(PointBinaryEncoder)];
        let outcome = dispatch(&entries, &Point { x: 5, y: 6 }).unwrap();
        match outcome {
            EncodeOutcome::Binary(b) => assert_eq!(b, vec![5, 6]),
            _ => panic!("expected binary"),
        }
    }

    #[test]
    fn no_match_is_an_error() {
        let entries: Vec<EncoderEntry> = vec![];
        assert!(dispatch(&entries, &Point { x: 0, y: 0 }).is_err());
    }
}
