//! Tests for JSON documents

use indexmap::IndexMap;
use oracledb::params::OptionMap;
use oracledb::driver::memory::MemoryContext;
use oracledb::types::JsonText;
use oracledb::{
    Context, IntervalYM, JsonCapabilities, NativeType, NativeValue, OracleNumber, OracleType, Session,
    Timestamp, VarSpec,
};
use serde_json::json;

fn session() -> Session {
    let context = Context::new(MemoryContext::new(), &OptionMap::new()).unwrap();
    context.connect("scott", "tiger", "localhost/FREEPDB1", &OptionMap::new()).unwrap()
}

mod document_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_map_keeps_field_order() {
        let session = session();
        let doc = session.new_json().unwrap();
        let mut map = IndexMap::new();
        map.insert("zeta".to_string(), NativeValue::Integer(1));
        map.insert("alpha".to_string(), NativeValue::from("two"));
        map.insert(
            "list".to_string(),
            NativeValue::Array(vec![NativeValue::Boolean(true), NativeValue::Null, NativeValue::Float(1.5)]),
        );
        doc.set_value(&NativeValue::Map(map.clone())).unwrap();

        let value = doc.value().unwrap();
        let keys: Vec<&str> = value.as_map().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "list"]);
        assert_eq!(value, NativeValue::Map(map));
    }

    #[test]
    fn test_serde_json_round_trip() {
        let session = session();
        let doc = session.new_json().unwrap();
        let source = json!({
            "id": 7,
            "name": "widget",
            "price": 19.5,
            "tags": ["a", "b"],
            "dims": {"w": 2, "h": -3},
            "discontinued": false,
            "note": null
        });
        doc.set_value(&NativeValue::from(source.clone())).unwrap();

        let back = serde_json::Value::try_from(doc.value().unwrap()).unwrap();
        assert_eq!(back, source);
    }

    #[test]
    fn test_large_numbers_as_text() {
        let session = session();
        let doc = session.new_json().unwrap();
        let big = OracleNumber::parse("123456789012345678901234567890").unwrap();
        doc.set_value(&NativeValue::Array(vec![
            NativeValue::UInteger(u64::MAX),
            NativeValue::Number(big.clone()),
        ]))
        .unwrap();

        let value = doc.value().unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items[0], NativeValue::Number(OracleNumber::parse("18446744073709551615").unwrap()));
        assert_eq!(items[1], NativeValue::Number(big));
    }

    #[test]
    fn test_scalars_and_dates() {
        let session = session();
        let doc = session.new_json().unwrap();
        let ts = Timestamp::new(2024, 2, 29, 12, 30, 0, 0);
        doc.set_value(&NativeValue::Array(vec![
            NativeValue::Timestamp(ts),
            NativeValue::IntervalYM(IntervalYM::new(1, 6)),
            NativeValue::Bytes(vec![1, 2, 3]),
        ]))
        .unwrap();
        assert_eq!(
            doc.value().unwrap(),
            NativeValue::Array(vec![
                NativeValue::Timestamp(ts),
                NativeValue::IntervalYM(IntervalYM::new(1, 6)),
                NativeValue::Bytes(vec![1, 2, 3]),
            ])
        );
    }

    #[test]
    fn test_unstorable_value() {
        let session = session();
        let doc = session.new_json().unwrap();
        let lob = session.new_temp_lob(OracleType::Blob).unwrap();
        assert!(doc.set_value(&lob.into()).is_err());
    }
}

mod capability_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct Point {
        x: i64,
        y: i64,
    }

    impl JsonCapabilities for Point {
        fn to_json_map(&self) -> Option<IndexMap<String, NativeValue>> {
            let mut map = IndexMap::new();
            map.insert("x".to_string(), NativeValue::Integer(self.x));
            map.insert("y".to_string(), NativeValue::Integer(self.y));
            Some(map)
        }

        fn to_json_text(&self) -> JsonText {
            JsonText::Text(format!("({}, {})", self.x, self.y))
        }
    }

    #[derive(Debug)]
    struct Opaque;

    impl JsonCapabilities for Opaque {
        fn to_json_text(&self) -> JsonText {
            JsonText::Text("opaque".to_string())
        }
    }

    #[test]
    fn test_map_capability() {
        let session = session();
        let doc = session.new_json().unwrap();
        doc.set_value(&NativeValue::custom(Point { x: 3, y: -4 })).unwrap();
        let back = serde_json::Value::try_from(doc.value().unwrap()).unwrap();
        assert_eq!(back, json!({"x": 3, "y": -4}));
    }

    #[test]
    fn test_text_fallback() {
        let session = session();
        let doc = session.new_json().unwrap();
        doc.set_value(&NativeValue::custom(Opaque)).unwrap();
        assert_eq!(doc.value().unwrap(), NativeValue::from("opaque"));
    }

    #[test]
    fn test_unrepresentable_date_falls_back_to_text() {
        let session = session();
        let doc = session.new_json().unwrap();
        let far = chrono::NaiveDate::from_ymd_opt(40_000, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        doc.set_value(&NativeValue::custom(far)).unwrap();
        assert_eq!(doc.value().unwrap(), NativeValue::from(far.to_string()));
    }

    #[test]
    fn test_chrono_duration() {
        let session = session();
        let doc = session.new_json().unwrap();
        doc.set_value(&NativeValue::custom(chrono::Duration::seconds(90))).unwrap();
        let value = doc.value().unwrap();
        let iv = value.as_interval_ds().unwrap();
        assert_eq!(iv.to_array(), [0, 0, 1, 30, 0]);
    }
}

mod json_var_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_json_var() {
        let session = session();
        let var = session
            .new_var(VarSpec::new(OracleType::Json, NativeType::Json).with_array_size(2))
            .unwrap();
        assert_eq!(var.get(0).unwrap(), NativeValue::Null);

        var.set(0, &NativeValue::from(json!({"k": [1, 2]}))).unwrap();
        var.set(1, &NativeValue::from("plain")).unwrap();
        assert_eq!(
            serde_json::Value::try_from(var.get(0).unwrap()).unwrap(),
            json!({"k": [1, 2]})
        );
        assert_eq!(var.get(1).unwrap(), NativeValue::from("plain"));

        var.set(0, &NativeValue::Null).unwrap();
        assert_eq!(var.get(0).unwrap(), NativeValue::Null);
    }
}
