//! Operation and response fixtures.

use feed_core::wire::{
    JsonWireCodec, Response, WireCodec, WireDataOperation, WireOperationType, WirePayload,
};
use feed_core::{ContinuationToken, DataOperation, Payload, WireContentId};

/// `UpdateOrAppend` of a feature payload.
pub fn feature_op(id: &str, data: &[u8]) -> DataOperation {
    DataOperation::update_or_append(id, Payload::Feature(data.to_vec()))
}

/// `UpdateOrAppend` of a shared-state payload.
pub fn shared_state_op(id: &str, data: &[u8]) -> DataOperation {
    DataOperation::update_or_append(id, Payload::SharedState(data.to_vec()))
}

/// `UpdateOrAppend` of a continuation token.
pub fn token_op(id: &str, token: &str) -> DataOperation {
    DataOperation::update_or_append(id, Payload::Token(ContinuationToken::new(token)))
}

/// `Remove` of one id.
pub fn remove_op(id: &str) -> DataOperation {
    DataOperation::remove(id)
}

/// `ClearAll` over every namespace.
pub fn clear_op() -> DataOperation {
    DataOperation::clear_all()
}

/// Wire update carrying a feature.
pub fn wire_feature(namespace: &str, id: u64, data: &[u8]) -> WireDataOperation {
    WireDataOperation {
        operation: WireOperationType::UpdateOrAppend,
        content_id: Some(WireContentId::new(namespace, id)),
        payload: Some(WirePayload::Feature {
            data: data.to_vec(),
        }),
    }
}

/// Wire update carrying a continuation token.
pub fn wire_token(namespace: &str, id: u64, token: &str) -> WireDataOperation {
    WireDataOperation {
        operation: WireOperationType::UpdateOrAppend,
        content_id: Some(WireContentId::new(namespace, id)),
        payload: Some(WirePayload::Token {
            token: token.to_string(),
        }),
    }
}

/// Wire remove.
pub fn wire_remove(namespace: &str, id: u64) -> WireDataOperation {
    WireDataOperation {
        operation: WireOperationType::Remove,
        content_id: Some(WireContentId::new(namespace, id)),
        payload: None,
    }
}

/// JSON response body holding `operations`.
pub fn response_bytes(operations: Vec<WireDataOperation>) -> Vec<u8> {
    JsonWireCodec
        .encode(&Response::new(operations))
        .unwrap_or_default()
}
