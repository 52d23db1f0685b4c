//! Integration tests for codecs and key mapping.

use courier_core::{Codec, Direction, KeyMap, RequestSpec, TypedSchema, map_keys};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderForm {
    order_id: u64,
    line_items: Vec<LineItemForm>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LineItemForm {
    unit_price: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct OrderRow {
    order_id: u64,
    line_items: Vec<LineItemRow>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LineItemRow {
    unit_price: f64,
}

fn order_keys() -> KeyMap {
    KeyMap::from_pairs([
        ("order_id", "orderId"),
        ("line_items", "lineItems"),
        ("unit_price", "unitPrice"),
    ])
}

#[test]
fn test_codec_request_and_response_are_symmetric() {
    let codec = Codec::new()
        .with_request(TypedSchema::<OrderForm>::new(), TypedSchema::<OrderRow>::new())
        .with_response(TypedSchema::<OrderForm>::new(), TypedSchema::<OrderRow>::new())
        .with_key_map(order_keys());

    let form = json!({ "orderId": 9, "lineItems": [{ "unitPrice": 2.5 }] });
    let row = codec.encode_request(&form).unwrap().unwrap();
    assert_eq!(row, json!({ "order_id": 9, "line_items": [{ "unit_price": 2.5 }] }));

    let back = codec.decode_response(&row).unwrap().unwrap();
    assert_eq!(back, form);
}

#[test]
fn test_key_map_round_trip_over_arrays() {
    let keys = order_keys();
    let value = json!([{ "orderId": 1 }, { "lineItems": [] }, 3, "orderId"]);

    let there = map_keys(&value, &keys, Direction::FrontendToBackend);
    let back = map_keys(&there, &keys, Direction::BackendToFrontend);
    assert_eq!(back, value);
}

#[test]
fn test_request_spec_with_json_payload() {
    let form = OrderForm {
        order_id: 4,
        line_items: vec![],
    };
    let spec = RequestSpec::post("/orders").with_json(&form).unwrap();
    assert_eq!(spec.payload, Some(json!({ "orderId": 4, "lineItems": [] })));
}
