#![no_main]

use libfuzzer_sys::fuzz_target;
use rustua_core::catalog::{self, DatagramDataSetReaderTransportDataType, NetworkAddressUrlDataType};
use rustua_core::encoding::{decode_binary, encode_binary};
use rustua_core::EncodingContext;
use std::sync::Arc;

fuzz_target!(|data: &[u8]| {
    let Ok(registry) = catalog::pubsub() else {
        return;
    };
    let ctx = EncodingContext::for_registry(Arc::new(registry));
    for type_id in [
        DatagramDataSetReaderTransportDataType::IDENTITY.type_id,
        NetworkAddressUrlDataType::IDENTITY.type_id,
    ] {
        if let Ok(value) = decode_binary(&ctx, data, &type_id) {
            // anything that decodes must encode again
            let mut buf = vec![0u8; data.len() + 64];
            encode_binary(&ctx, &value, &mut buf).unwrap();
        }
    }
});
