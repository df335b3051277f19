//! Integration tests for the generated encoders and decoders.

use cborgen::{from_slice, to_vec, BigUint, Deferred, Error, MarshalCbor, UnmarshalCbor};
use cborgen_derive::{CborMap, CborTuple};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

fn round_trip<T>(value: &T) -> Vec<u8>
where
    T: MarshalCbor + UnmarshalCbor + PartialEq + fmt::Debug,
{
    let bytes = to_vec(value).expect("encoding must work");
    let decoded: T = from_slice(&bytes).expect("decoding must work");
    assert_eq!(*value, decoded, "round trip changed the value");
    bytes
}

#[derive(Debug, Clone, Default, PartialEq, CborTuple)]
struct SimpleTypeOne {
    pub foo: String,
    pub value: u64,
    pub binary: Vec<u8>,
    pub signed: i64,
}

#[derive(Debug, Clone, Default, PartialEq, CborTuple)]
struct SimpleTypeTwo {
    pub stuff: Option<Box<SimpleTypeTwo>>,
    pub others: Vec<u64>,
    pub signed_others: Vec<i64>,
    pub test: Vec<Vec<u8>>,
    pub dog: String,
    pub pizza: Option<u64>,
    pub trio: [SimpleTypeOne; 3],
}

fn sample_one() -> SimpleTypeOne {
    SimpleTypeOne {
        foo: "cat".into(),
        value: 1337,
        binary: vec![0xde, 0xad, 0xbe, 0xef],
        signed: -42,
    }
}

#[test]
fn test_simple_round_trip() {
    round_trip(&SimpleTypeOne::default());
    round_trip(&sample_one());
}

#[test]
fn test_determinism() {
    let value = sample_one();
    assert_eq!(to_vec(&value).unwrap(), to_vec(&value).unwrap());
}

#[test]
fn test_nested_and_optional() {
    let inner = SimpleTypeTwo {
        dog: "woof".into(),
        pizza: Some(7),
        ..Default::default()
    };
    let value = SimpleTypeTwo {
        stuff: Some(Box::new(inner)),
        others: vec![0, 1, u64::MAX],
        signed_others: vec![i64::MIN, -1, 0, i64::MAX],
        test: vec![vec![], vec![0xff], vec![1, 2, 3]],
        dog: "bark".into(),
        pizza: None,
        trio: [sample_one(), SimpleTypeOne::default(), sample_one()],
    };
    round_trip(&value);
}

#[test]
fn test_deep_self_reference() {
    let mut value = SimpleTypeTwo::default();
    for _ in 0..16 {
        value = SimpleTypeTwo {
            stuff: Some(Box::new(value)),
            ..Default::default()
        };
    }
    round_trip(&value);
}

#[test]
fn test_signed_boundaries() {
    for signed in [i64::MIN, -1, 0, 1, i64::MAX] {
        let value = SimpleTypeOne {
            signed,
            ..Default::default()
        };
        round_trip(&value);
    }
}

#[derive(Debug, Clone, PartialEq, CborTuple)]
struct FixedArrays {
    pub bytes: [u8; 20],
    pub uint64: [u64; 20],
}

#[test]
fn test_fixed_arrays() {
    let value = FixedArrays {
        bytes: [0xab; 20],
        uint64: [99; 20],
    };
    let bytes = round_trip(&value);
    // byte string of 20, then an array of 20 items
    assert_eq!(bytes[..2], [0x82, 0x54]);
}

#[test]
fn test_fixed_bytes_wrong_length() {
    // frame of 2: a 19-byte string where 20 bytes are expected
    let mut bad = vec![0x82, 0x53];
    bad.extend_from_slice(&[0u8; 19]);
    assert!(matches!(
        from_slice::<FixedArrays>(&bad),
        Err(Error::WrongLength(_, 20, 19))
    ));
}

#[derive(Debug, Clone, Default, PartialEq, CborTuple)]
struct DeferredContainer {
    pub stuff: Option<Box<SimpleTypeOne>>,
    pub deferred: Deferred,
    pub value: u64,
}

#[test]
fn test_deferred_pass_through() {
    let value = DeferredContainer {
        stuff: Some(Box::new(sample_one())),
        deferred: Deferred {
            raw: to_vec(&sample_one()).unwrap().into(),
        },
        value: 10,
    };
    round_trip(&value);
}

#[test]
fn test_deferred_captures_unknown_structure() {
    // the deferred slot holds a map this schema knows nothing about
    let encoded = [
        0x83, 0xf6, 0xa1, 0x61, b'k', 0x82, 0x01, 0x02, 0x0a,
    ];
    let decoded: DeferredContainer = from_slice(&encoded).unwrap();
    assert_eq!(decoded.stuff, None);
    assert_eq!(&decoded.deferred.raw[..], &encoded[2..8]);
    assert_eq!(decoded.value, 10);
    assert_eq!(to_vec(&decoded).unwrap(), encoded);
}

#[derive(Debug, Clone, Default, PartialEq, CborMap)]
struct RenamedFields {
    pub foo: i64,
    #[cborgen(rename = "beep")]
    pub bar: String,
}

#[test]
fn test_renamed_fields() {
    let value = RenamedFields {
        foo: -3,
        bar: "hi".into(),
    };
    let bytes = round_trip(&value);
    // keys emitted in ascending byte order: "beep" before "foo"
    assert_eq!(
        bytes,
        [
            0xa2, 0x64, b'b', b'e', b'e', b'p', 0x62, b'h', b'i', 0x63, b'f', b'o', b'o', 0x22,
        ]
    );
}

#[derive(Debug, Clone, Default, PartialEq, CborMap)]
struct BoolOnly {
    pub thing: bool,
}

#[test]
fn test_bool_only_map() {
    let bytes = round_trip(&BoolOnly { thing: true });
    assert_eq!(bytes, [0xa1, 0x65, b't', b'h', b'i', b'n', b'g', 0xf5]);
    let bytes = round_trip(&BoolOnly { thing: false });
    assert_eq!(bytes, [0xa1, 0x65, b't', b'h', b'i', b'n', b'g', 0xf4]);
}

#[derive(Debug, Clone, Default, PartialEq, CborTuple)]
struct BigField {
    #[cborgen(maxlen = 10000000)]
    pub large_bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, CborTuple)]
struct SmallField {
    pub bytes: Vec<u8>,
}

#[test]
fn test_maxlen_override() {
    let payload = vec![0x55; 3 << 20];

    // beyond the default ceiling, but the override admits it
    let value = BigField {
        large_bytes: payload.clone(),
    };
    round_trip(&value);

    // the same payload without an override is rejected on both sides
    let value = SmallField {
        bytes: payload,
    };
    assert!(matches!(to_vec(&value), Err(Error::TooLong(_, _, _))));
}

#[test]
fn test_maxlen_checked_before_bulk_read() {
    // claims a 3 MiB byte string but carries no payload at all
    let encoded = [0x81, 0x5a, 0x00, 0x30, 0x00, 0x00];
    assert!(matches!(
        from_slice::<SmallField>(&encoded),
        Err(Error::TooLong(_, _, _))
    ));
}

#[derive(Debug, Clone, Default, PartialEq, CborTuple)]
struct BigNumbers {
    pub magnitude: BigUint,
    pub maybe: Option<BigUint>,
}

#[test]
fn test_bignum_round_trip() {
    for magnitude in [
        BigUint::default(),
        BigUint::from(1u64),
        BigUint::from(255u64),
        BigUint::from(u64::MAX),
        BigUint::from_bytes_be(&[1, 0, 0, 0, 0, 0, 0, 0, 0]),
        BigUint::from_bytes_be(&[0xff; 32]),
    ] {
        let value = BigNumbers {
            magnitude: magnitude.clone(),
            maybe: Some(magnitude),
        };
        round_trip(&value);
    }
}

#[test]
fn test_bignum_absent_decodes_as_zero() {
    let value = BigNumbers {
        magnitude: BigUint::default(),
        maybe: None,
    };
    let bytes = to_vec(&value).unwrap();
    // both fields encode as tag(2) over an empty magnitude
    assert_eq!(bytes, [0x82, 0xc2, 0x40, 0xc2, 0x40]);
    let decoded: BigNumbers = from_slice(&bytes).unwrap();
    assert_eq!(decoded.maybe, Some(BigUint::default()));
}

#[test]
fn test_bignum_magnitude_capped() {
    let mut encoded = vec![0x82, 0xc2, 0x59, 0x01, 0x01];
    encoded.extend_from_slice(&[0xaa; 257]);
    encoded.extend_from_slice(&[0xc2, 0x40]);
    assert!(matches!(
        from_slice::<BigNumbers>(&encoded),
        Err(Error::TooLong(_, 257, 256))
    ));
}

#[derive(Debug, Clone, Default, PartialEq, CborTuple)]
struct MapsOfRecords {
    pub sorted: BTreeMap<String, SimpleTypeOne>,
    pub unsorted: HashMap<String, SimpleTypeOne>,
    pub optional_values: BTreeMap<String, Option<SimpleTypeOne>>,
}

#[test]
fn test_maps_of_records() {
    let mut value = MapsOfRecords::default();
    value.sorted.insert("b".into(), sample_one());
    value.sorted.insert("a".into(), SimpleTypeOne::default());
    value.unsorted.insert("zz".into(), sample_one());
    value.unsorted.insert("aa".into(), SimpleTypeOne::default());
    value.optional_values.insert("gone".into(), None);
    value
        .optional_values
        .insert("here".into(), Some(sample_one()));
    round_trip(&value);
}

#[test]
fn test_hash_map_insertion_order_irrelevant() {
    let pairs = [("delta", 0u64), ("alpha", 1), ("echo", 2), ("bravo", 3)];
    let mut forward = HashMap::new();
    for (key, count) in pairs {
        forward.insert(key.to_string(), count);
    }
    let mut reverse = HashMap::new();
    for (key, count) in pairs.iter().rev() {
        reverse.insert(key.to_string(), *count);
    }

    #[derive(Debug, Clone, Default, PartialEq, CborTuple)]
    struct Counts {
        pub counts: HashMap<String, u64>,
    }

    let forward = Counts { counts: forward };
    let reverse = Counts { counts: reverse };
    assert_eq!(forward.counts, reverse.counts);
    assert_eq!(to_vec(&forward).unwrap(), to_vec(&reverse).unwrap());
}

#[derive(Debug, Clone, Default, PartialEq, CborTuple)]
struct WithByte {
    pub small: u8,
}

#[test]
fn test_u8_round_trip_and_overflow() {
    for small in [0u8, 1, 127, 255] {
        round_trip(&WithByte { small });
    }
    // 300 does not fit a u8
    let encoded = [0x81, 0x19, 0x01, 0x2c];
    assert!(matches!(
        from_slice::<WithByte>(&encoded),
        Err(Error::Overflow(_))
    ));
}

#[derive(Debug, Clone, Default, PartialEq, CborTuple)]
#[allow(dead_code)]
struct PartiallyVisible {
    pub shown: u64,
    hidden: u64,
}

#[test]
fn test_private_fields_are_invisible() {
    let value = PartiallyVisible {
        shown: 5,
        hidden: 9,
    };
    let bytes = to_vec(&value).unwrap();
    // one-element frame: the private field is neither counted nor written
    assert_eq!(bytes, [0x81, 0x05]);

    let decoded: PartiallyVisible = from_slice(&bytes).unwrap();
    assert_eq!(decoded.shown, 5);
    assert_eq!(decoded.hidden, 0);
}
