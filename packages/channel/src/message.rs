//! Wire messages exchanged between the editor host, the presentation frame
//! and the asset relay.
//!
//! Every message is a JSON object with a `type` discriminator and camelCase
//! fields. Binary payloads travel as base64 strings.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use stagefs_core::FrameId;

use crate::error::ChannelError;

/// Identifier correlating a call with its reply. Allocated per endpoint.
pub type RequestId = u64;

/// The closed set of protocol messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Message {
    /// Presentation frame asks the host for the project file.
    LoadScratchFile { request_id: RequestId },

    /// Project bytes; empty when the host has no project yet.
    LoadScratchFileResponse {
        request_id: RequestId,
        #[serde(with = "base64_bytes")]
        body: Bytes,
    },

    /// Request for a file relative to the project folder.
    GetFile { request_id: RequestId, path: String },

    /// `file_content` is absent when the file does not exist.
    GetFileResponse {
        request_id: RequestId,
        #[serde(default, with = "base64_opt", skip_serializing_if = "Option::is_none")]
        file_content: Option<Bytes>,
    },

    /// Generated files, keyed by relative output path.
    SaveLeopardFiles {
        request_id: RequestId,
        #[serde(with = "base64_map")]
        body: BTreeMap<String, Bytes>,
    },

    SaveLeopardFilesResponse { request_id: RequestId },

    /// The in-memory project diverged from what the host last saw.
    ScratchContentChanged,

    /// Host asks the presentation frame for the current project bytes.
    GetScratchFile { request_id: RequestId },

    /// Presentation frame asks the relay which frame id it has.
    GetClientId { request_id: RequestId },

    GetClientIdResponse {
        request_id: RequestId,
        client_id: FrameId,
    },

    /// Generic reply carrying an optional body.
    Response {
        request_id: RequestId,
        #[serde(default, with = "base64_opt", skip_serializing_if = "Option::is_none")]
        body: Option<Bytes>,
    },

    /// A call could not be served. Not an answer to the request itself.
    ErrorResponse {
        request_id: RequestId,
        message: String,
    },

    /// Any `type` this side does not understand.
    #[serde(other)]
    Unknown,
}

impl Message {
    /// The request id this message answers, if it is a reply.
    pub fn reply_to(&self) -> Option<RequestId> {
        match self {
            Message::LoadScratchFileResponse { request_id, .. }
            | Message::GetFileResponse { request_id, .. }
            | Message::SaveLeopardFilesResponse { request_id }
            | Message::GetClientIdResponse { request_id, .. }
            | Message::Response { request_id, .. }
            | Message::ErrorResponse { request_id, .. } => Some(*request_id),
            Message::LoadScratchFile { .. }
            | Message::GetFile { .. }
            | Message::SaveLeopardFiles { .. }
            | Message::ScratchContentChanged
            | Message::GetScratchFile { .. }
            | Message::GetClientId { .. }
            | Message::Unknown => None,
        }
    }

    /// The wire name of this message kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::LoadScratchFile { .. } => "loadScratchFile",
            Message::LoadScratchFileResponse { .. } => "loadScratchFileResponse",
            Message::GetFile { .. } => "getFile",
            Message::GetFileResponse { .. } => "getFileResponse",
            Message::SaveLeopardFiles { .. } => "saveLeopardFiles",
            Message::SaveLeopardFilesResponse { .. } => "saveLeopardFilesResponse",
            Message::ScratchContentChanged => "scratchContentChanged",
            Message::GetScratchFile { .. } => "getScratchFile",
            Message::GetClientId { .. } => "getClientId",
            Message::GetClientIdResponse { .. } => "getClientIdResponse",
            Message::Response { .. } => "response",
            Message::ErrorResponse { .. } => "errorResponse",
            Message::Unknown => "unknown",
        }
    }

    /// Encode into the JSON value carried by an [`Envelope`].
    pub fn to_value(&self) -> Result<serde_json::Value, ChannelError> {
        serde_json::to_value(self).map_err(|e| ChannelError::Encode(e.to_string()))
    }

    /// Decode from an envelope payload.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ChannelError> {
        serde_json::from_value(value).map_err(|e| ChannelError::Decode(e.to_string()))
    }
}

/// A message in transit, stamped with the sender's origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub origin: String,
    pub data: serde_json::Value,
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}

mod base64_opt {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &Option<Bytes>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => serializer.serialize_some(&STANDARD.encode(b)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Bytes>, D::Error> {
        let encoded = Option::<String>::deserialize(deserializer)?;
        encoded
            .map(|s| {
                STANDARD
                    .decode(s.as_bytes())
                    .map(Bytes::from)
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
    }
}

mod base64_map {
    use std::collections::BTreeMap;

    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use bytes::Bytes;
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        files: &BTreeMap<String, Bytes>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(files.len()))?;
        for (path, bytes) in files {
            map.serialize_entry(path, &STANDARD.encode(bytes))?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, Bytes>, D::Error> {
        let encoded = BTreeMap::<String, String>::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|(path, s)| {
                let bytes = STANDARD
                    .decode(s.as_bytes())
                    .map_err(serde::de::Error::custom)?;
                Ok((path, Bytes::from(bytes)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_shape_is_camel_case_with_type_tag() {
        let msg = Message::GetFile {
            request_id: 7,
            path: "leopard/index.js".to_string(),
        };
        assert_eq!(
            msg.to_value().unwrap(),
            json!({"type": "getFile", "requestId": 7, "path": "leopard/index.js"})
        );
    }

    #[test]
    fn unit_message_has_only_a_tag() {
        assert_eq!(
            Message::ScratchContentChanged.to_value().unwrap(),
            json!({"type": "scratchContentChanged"})
        );
    }

    #[test]
    fn binary_payloads_are_base64() {
        let msg = Message::GetFileResponse {
            request_id: 3,
            file_content: Some(Bytes::from_static(b"hi")),
        };
        let value = msg.to_value().unwrap();
        assert_eq!(value["fileContent"], json!("aGk="));
        assert_eq!(Message::from_value(value).unwrap(), msg);
    }

    #[test]
    fn absent_file_content_decodes_as_none() {
        let msg = Message::from_value(json!({"type": "getFileResponse", "requestId": 1})).unwrap();
        assert_eq!(
            msg,
            Message::GetFileResponse {
                request_id: 1,
                file_content: None
            }
        );
        let msg = Message::from_value(
            json!({"type": "getFileResponse", "requestId": 1, "fileContent": null}),
        )
        .unwrap();
        assert_eq!(msg.reply_to(), Some(1));
    }

    #[test]
    fn error_response_is_a_reply() {
        let msg = Message::ErrorResponse {
            request_id: 5,
            message: "channel closed".into(),
        };
        assert_eq!(
            msg.to_value().unwrap(),
            json!({"type": "errorResponse", "requestId": 5, "message": "channel closed"})
        );
        assert_eq!(msg.reply_to(), Some(5));
        assert_eq!(msg.kind(), "errorResponse");
    }

    #[test]
    fn save_files_map_decodes() {
        let msg = Message::from_value(json!({
            "type": "saveLeopardFiles",
            "requestId": 2,
            "body": {"./index.html": "PGh0bWw+", "./index.js": ""}
        }))
        .unwrap();
        match msg {
            Message::SaveLeopardFiles { body, .. } => {
                assert_eq!(&body["./index.html"][..], b"<html>");
                assert!(body["./index.js"].is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_tolerated() {
        let msg = Message::from_value(json!({"type": "somethingNew", "x": 1})).unwrap();
        assert_eq!(msg, Message::Unknown);
        assert_eq!(msg.reply_to(), None);
    }

    #[test]
    fn malformed_known_type_is_a_decode_error() {
        let err = Message::from_value(json!({"type": "getFile"})).unwrap_err();
        assert!(matches!(err, ChannelError::Decode(_)));
    }

    #[test]
    fn reply_kinds() {
        assert_eq!(Message::SaveLeopardFilesResponse { request_id: 9 }.reply_to(), Some(9));
        assert_eq!(
            Message::Response {
                request_id: 4,
                body: None
            }
            .reply_to(),
            Some(4)
        );
        assert_eq!(Message::GetScratchFile { request_id: 4 }.reply_to(), None);
        assert_eq!(Message::GetClientId { request_id: 1 }.kind(), "getClientId");
    }

    #[test]
    fn client_id_is_a_plain_string() {
        let id = FrameId::new();
        let value = Message::GetClientIdResponse {
            request_id: 1,
            client_id: id,
        }
        .to_value()
        .unwrap();
        assert_eq!(value["clientId"], json!(id.to_string()));
    }
}
