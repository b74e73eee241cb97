#![no_main]

use libfuzzer_sys::fuzz_target;
use rustua_core::catalog::{self, DatagramDataSetReaderTransportDataType};
use rustua_core::encoding::{decode_json, encode_json};
use rustua_core::EncodingContext;
use std::sync::Arc;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(registry) = catalog::pubsub() else {
        return;
    };
    let ctx = EncodingContext::for_registry(Arc::new(registry));
    let type_id = DatagramDataSetReaderTransportDataType::IDENTITY.type_id;
    if let Ok(value) = decode_json(&ctx, text, &type_id) {
        encode_json(&ctx, &value).unwrap();
    }
});
