//! Wire-format conformance: known byte vectors, frame length discipline,
//! canonical ordering, and cross-version compatibility of the map form.

use cborgen::{from_slice, to_vec, Cid, Error, MarshalCbor, UnmarshalCbor};
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

#[derive(Debug, Default, PartialEq, CborTuple)]
struct Empty {}

#[derive(Debug, Default, PartialEq, CborTuple)]
struct Unit;

#[test]
fn test_empty_record() {
    assert_eq!(round_trip(&Empty {}), [0x80]);
    assert_eq!(round_trip(&Unit), [0x80]);

    // a one-element frame is not an empty record
    assert!(matches!(
        from_slice::<Empty>(&[0x81, 0xf6]),
        Err(Error::WrongLength("Empty", 0, 1))
    ));
}

#[derive(Debug, Default, PartialEq, CborTuple)]
struct TextRecord {
    pub foo: String,
}

#[test]
fn test_single_text_field() {
    let bytes = round_trip(&TextRecord { foo: "cat".into() });
    assert_eq!(bytes, [0x81, 0x63, b'c', b'a', b't']);
}

#[derive(Debug, Default, PartialEq, CborTuple)]
struct PizzaRecord {
    pub pizza: Option<u64>,
}

#[test]
fn test_optional_absent_and_present() {
    let bytes = round_trip(&PizzaRecord { pizza: None });
    assert_eq!(bytes, [0x81, 0xf6]);

    let bytes = round_trip(&PizzaRecord { pizza: Some(7) });
    assert_eq!(bytes, [0x81, 0x07]);
}

#[derive(Debug, Default, PartialEq, CborTuple)]
struct SignedRecord {
    pub s: i64,
}

#[test]
fn test_signed_wire_form() {
    let bytes = round_trip(&SignedRecord { s: -1 });
    assert_eq!(bytes, [0x81, 0x20]);
}

#[test]
fn test_signed_boundaries() {
    for s in [i64::MIN, -1, 0, 1, i64::MAX] {
        round_trip(&SignedRecord { s });
    }
}

#[test]
fn test_signed_overflow_rejected() {
    // u64::MAX as an unsigned value, and as a negative offset
    for bytes in [
        [0x81, 0x1b, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff],
        [0x81, 0x3b, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff],
    ] {
        assert!(matches!(
            from_slice::<SignedRecord>(&bytes),
            Err(Error::Overflow("SignedRecord.s"))
        ));
    }
}

#[derive(Debug, Default, PartialEq, CborTuple)]
struct CountRecord {
    pub m: HashMap<String, u64>,
}

#[derive(Debug, Default, PartialEq, CborTuple)]
struct SortedCountRecord {
    pub m: BTreeMap<String, u64>,
}

#[test]
fn test_map_canonical_ordering() {
    let mut value = CountRecord::default();
    value.m.insert("b".into(), 2);
    value.m.insert("a".into(), 1);
    let bytes = round_trip(&value);
    assert_eq!(
        bytes,
        [0x81, 0xa2, 0x61, b'a', 0x01, 0x61, b'b', 0x02]
    );

    // the btree-backed record produces the identical encoding
    let mut sorted = SortedCountRecord::default();
    sorted.m.insert("b".into(), 2);
    sorted.m.insert("a".into(), 1);
    assert_eq!(to_vec(&sorted).unwrap(), bytes);
}

#[derive(Debug, Default, PartialEq, CborMap)]
struct NarrowRecord {
    #[cborgen(rename = "A")]
    pub a: u64,
}

#[test]
fn test_unknown_key_skipped() {
    let bytes = round_trip(&NarrowRecord { a: 1 });
    assert_eq!(bytes, [0xa1, 0x61, b'A', 0x01]);

    // the same record with an extra field "B" decodes cleanly
    let wider = [0xa2, 0x61, b'A', 0x01, 0x61, b'B', 0x02];
    let decoded: NarrowRecord = from_slice(&wider).unwrap();
    assert_eq!(decoded, NarrowRecord { a: 1 });
}

#[derive(Debug, Default, PartialEq, CborTuple)]
struct NumberRecord {
    pub n: u64,
}

#[test]
fn test_tuple_length_discipline() {
    assert!(matches!(
        from_slice::<NumberRecord>(&[0x80]),
        Err(Error::WrongLength("NumberRecord", 1, 0))
    ));
    assert!(matches!(
        from_slice::<NumberRecord>(&[0x82, 0x01, 0x02]),
        Err(Error::WrongLength("NumberRecord", 1, 2))
    ));
}

#[test]
fn test_frame_major_type_checked() {
    assert!(matches!(
        from_slice::<NumberRecord>(&[0xa1, 0x61, b'n', 0x01]),
        Err(Error::WrongType("NumberRecord", _, _))
    ));
}

#[test]
fn test_non_canonical_rejected() {
    // 7 encoded with a needless one-byte extension
    assert!(matches!(
        from_slice::<NumberRecord>(&[0x81, 0x18, 0x07]),
        Err(Error::NotCanonical)
    ));
}

#[test]
fn test_trailing_bytes_rejected() {
    assert!(matches!(
        from_slice::<NumberRecord>(&[0x81, 0x01, 0x00]),
        Err(Error::ExtraData(1))
    ));
}

// ---------- Cross-version compatibility (map form) ----------

#[derive(Debug, Clone, Default, PartialEq, CborTuple)]
struct Item {
    pub label: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, CborMap)]
struct RecordV1 {
    pub old_str: String,
    pub old_num: u64,
    pub old_ptr: Option<Cid>,
    pub old_map: BTreeMap<String, Item>,
    pub old_array: Vec<Item>,
    pub old_struct: Item,
}

#[derive(Debug, Clone, Default, PartialEq, CborMap)]
struct RecordV2 {
    pub old_str: String,
    pub new_str: String,
    pub old_num: u64,
    pub new_num: u64,
    pub old_ptr: Option<Cid>,
    pub new_ptr: Option<Cid>,
    pub old_map: BTreeMap<String, Item>,
    pub new_map: BTreeMap<String, Item>,
    pub old_array: Vec<Item>,
    pub new_array: Vec<Item>,
    pub old_struct: Item,
    pub new_struct: Item,
}

fn sample_item() -> Item {
    Item {
        label: "widget".into(),
        count: 4,
    }
}

fn sample_v1() -> RecordV1 {
    let mut old_map = BTreeMap::new();
    old_map.insert("w".into(), sample_item());
    RecordV1 {
        old_str: "hello".into(),
        old_num: 99,
        old_ptr: Some(Cid::new(vec![0x01, 0x55, 0x0c, 0x0d])),
        old_map,
        old_array: vec![sample_item(), Item::default()],
        old_struct: sample_item(),
    }
}

#[test]
fn test_old_record_decodes_under_new_schema() {
    let v1 = sample_v1();
    let bytes = to_vec(&v1).unwrap();

    let v2: RecordV2 = from_slice(&bytes).unwrap();
    assert_eq!(v2.old_str, v1.old_str);
    assert_eq!(v2.old_num, v1.old_num);
    assert_eq!(v2.old_ptr, v1.old_ptr);
    assert_eq!(v2.old_map, v1.old_map);
    assert_eq!(v2.old_array, v1.old_array);
    assert_eq!(v2.old_struct, v1.old_struct);

    // everything the old schema never knew stays at its default
    assert_eq!(v2.new_str, String::new());
    assert_eq!(v2.new_num, 0);
    assert_eq!(v2.new_ptr, None);
    assert!(v2.new_map.is_empty());
    assert!(v2.new_array.is_empty());
    assert_eq!(v2.new_struct, Item::default());
}

#[test]
fn test_new_record_decodes_under_old_schema() {
    let v1 = sample_v1();
    let mut new_map = BTreeMap::new();
    new_map.insert("n".into(), sample_item());
    let v2 = RecordV2 {
        old_str: v1.old_str.clone(),
        new_str: "extra".into(),
        old_num: v1.old_num,
        new_num: 123,
        old_ptr: v1.old_ptr.clone(),
        new_ptr: Some(Cid::new(vec![0x01, 0x71, 0xaa])),
        old_map: v1.old_map.clone(),
        new_map,
        old_array: v1.old_array.clone(),
        new_array: vec![Item::default()],
        old_struct: v1.old_struct.clone(),
        new_struct: sample_item(),
    };
    let bytes = to_vec(&v2).unwrap();

    // the unknown fields, including the cid, are skipped without complaint
    let decoded: RecordV1 = from_slice(&bytes).unwrap();
    assert_eq!(decoded, v1);
}

#[test]
fn test_map_form_round_trips() {
    round_trip(&sample_v1());
    round_trip(&RecordV1::default());
}
