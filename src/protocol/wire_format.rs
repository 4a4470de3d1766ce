//! Wire format encoding and decoding.
//!
//! A V2 response body is a JSON array of frame objects:
//! ```text
//! [
//!   {"FrameType":"DataSetHeader","IsProgressive":false,"Version":"v2.0"},
//!   {"FrameType":"DataTable","TableId":0,"TableKind":"PrimaryResult",...},
//!   {"FrameType":"DataSetCompletion","HasErrors":false,"Cancelled":false}
//! ]
//! ```
//!
//! Every frame object carries its discriminator in the `FrameType` field and
//! its payload in PascalCase fields next to it.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::frame::{Frame, FrameType};
use crate::error::{QueryV2Error, Result};

/// Name of the discriminator field.
pub const FRAME_TYPE_FIELD: &str = "FrameType";

/// Protocol version announced by current services.
pub const PROTOCOL_VERSION: &str = "v2.0";

/// Default maximum size of a single frame (1 GB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1_073_741_824;

/// Decode one frame object from its raw JSON bytes.
///
/// Unrecognized frame types decode to [`Frame::Unknown`]. A recognized type
/// whose payload does not match its shape is a `ProtocolDecode` error.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame> {
    let mut object: Map<String, Value> = serde_json::from_slice(bytes).map_err(|e| {
        QueryV2Error::ProtocolDecode(format!("frame is not a JSON object: {}", e))
    })?;

    let frame_type = match object.remove(FRAME_TYPE_FIELD) {
        Some(Value::String(name)) => name,
        Some(other) => {
            return Err(QueryV2Error::ProtocolDecode(format!(
                "{} must be a string, got {}",
                FRAME_TYPE_FIELD, other
            )))
        }
        None => {
            return Err(QueryV2Error::ProtocolDecode(format!(
                "frame has no {} field",
                FRAME_TYPE_FIELD
            )))
        }
    };

    let Some(known) = FrameType::from_name(&frame_type) else {
        return Ok(Frame::Unknown { frame_type });
    };

    let body = Value::Object(object);
    let frame = match known {
        FrameType::DataSetHeader => Frame::DataSetHeader(payload(known, body)?),
        FrameType::TableHeader => Frame::TableHeader(payload(known, body)?),
        FrameType::TableFragment => Frame::TableFragment(payload(known, body)?),
        FrameType::TableProgress => Frame::TableProgress(payload(known, body)?),
        FrameType::TableCompletion => Frame::TableCompletion(payload(known, body)?),
        FrameType::DataTable => Frame::DataTable(payload(known, body)?),
        FrameType::DataSetCompletion => Frame::DataSetCompletion(payload(known, body)?),
        FrameType::Unknown => Frame::Unknown { frame_type },
    };
    Ok(frame)
}

fn payload<T: DeserializeOwned>(frame_type: FrameType, body: Value) -> Result<T> {
    serde_json::from_value(body).map_err(|e| QueryV2Error::decode(frame_type.as_str(), e))
}

/// Encode a frame as a single JSON object.
pub fn encode_frame(frame: &Frame) -> Result<Vec<u8>> {
    let mut object = match frame {
        Frame::DataSetHeader(p) => to_object(p)?,
        Frame::TableHeader(p) => to_object(p)?,
        Frame::TableFragment(p) => to_object(p)?,
        Frame::TableProgress(p) => to_object(p)?,
        Frame::TableCompletion(p) => to_object(p)?,
        Frame::DataTable(p) => to_object(p)?,
        Frame::DataSetCompletion(p) => to_object(p)?,
        Frame::Unknown { .. } => Map::new(),
    };
    object.insert(
        FRAME_TYPE_FIELD.to_string(),
        Value::String(frame.type_name().to_string()),
    );
    serde_json::to_vec(&object)
        .map_err(|e| QueryV2Error::ProtocolDecode(format!("cannot encode frame: {}", e)))
}

fn to_object<T: Serialize>(payload: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(payload) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(QueryV2Error::ProtocolDecode(format!(
            "frame payload must encode as an object, got {}",
            other
        ))),
        Err(e) => Err(QueryV2Error::ProtocolDecode(format!(
            "cannot encode frame: {}",
            e
        ))),
    }
}

/// Encode a full response body: a JSON array of frames, one per line.
///
/// # Example
///
/// ```
/// use queryv2_client::protocol::{encode_response, Frame, FrameBuffer};
///
/// let body = encode_response(&[Frame::header("v2.0"), Frame::completion(false, false, None)]).unwrap();
/// let mut buffer = FrameBuffer::new();
/// assert_eq!(buffer.push(&body).unwrap().len(), 2);
/// ```
pub fn encode_response(frames: &[Frame]) -> Result<Vec<u8>> {
    let mut body = Vec::from(&b"["[..]);
    for (i, frame) in frames.iter().enumerate() {
        if i > 0 {
            body.push(b',');
        }
        body.push(b'\n');
        body.extend(encode_frame(frame)?);
    }
    body.extend_from_slice(b"\n]");
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnType, TableKind};
    use serde_json::json;

    #[test]
    fn test_decode_header() {
        let frame =
            decode_frame(br#"{"FrameType":"DataSetHeader","IsProgressive":true,"Version":"v2.0"}"#)
                .unwrap();
        match frame {
            Frame::DataSetHeader(header) => {
                assert_eq!(header.version, PROTOCOL_VERSION);
                assert!(header.is_progressive);
            }
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[test]
    fn test_decode_numeric_version() {
        let frame = decode_frame(br#"{"FrameType":"DataSetHeader","Version":2}"#).unwrap();
        match frame {
            Frame::DataSetHeader(header) => {
                assert_eq!(header.version, "2");
                assert!(!header.is_progressive);
            }
            other => panic!("unexpected {:?}", other),
        }

        let err = decode_frame(br#"{"FrameType":"DataSetHeader","Version":[2]}"#).unwrap_err();
        assert!(err.is_protocol());
    }

    #[test]
    fn test_decode_data_table() {
        let bytes = json!({
            "FrameType": "DataTable",
            "TableId": 1,
            "TableKind": "PrimaryResult",
            "TableName": "PrimaryResult",
            "Columns": [
                {"ColumnName": "Welcome", "ColumnType": "string"},
                {"ColumnName": "PI", "ColumnType": "real"}
            ],
            "Rows": [["Hello, World!", 3.141592653589793]]
        })
        .to_string();

        match decode_frame(bytes.as_bytes()).unwrap() {
            Frame::DataTable(table) => {
                assert_eq!(table.table_id, 1);
                assert_eq!(table.table_kind, TableKind::PrimaryResult);
                assert_eq!(table.columns[1].column_type, ColumnType::Real);
                assert_eq!(table.rows[0][0], json!("Hello, World!"));
            }
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[test]
    fn test_unknown_frame_type_is_not_an_error() {
        let frame = decode_frame(br#"{"FrameType":"TableSchemaDelta","Anything":[1,2,3]}"#).unwrap();
        assert_eq!(
            frame,
            Frame::Unknown {
                frame_type: "TableSchemaDelta".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_known_payload_is_decode_error() {
        let err = decode_frame(br#"{"FrameType":"DataSetCompletion","HasErrors":"maybe"}"#)
            .unwrap_err();
        assert!(matches!(err, QueryV2Error::ProtocolDecode(_)));
        assert!(err.to_string().contains("invalid DataSetCompletion payload"));
    }

    #[test]
    fn test_missing_frame_type() {
        let err = decode_frame(br#"{"Version":"v2.0"}"#).unwrap_err();
        assert!(err.to_string().contains("no FrameType field"));
    }

    #[test]
    fn test_non_string_frame_type() {
        let err = decode_frame(br#"{"FrameType":7}"#).unwrap_err();
        assert!(err.to_string().contains("must be a string"));
    }

    #[test]
    fn test_not_an_object() {
        let err = decode_frame(b"[1,2]").unwrap_err();
        assert!(err.to_string().contains("not a JSON object"));
    }

    #[test]
    fn test_encode_frame_includes_discriminator() {
        let bytes = encode_frame(&Frame::completion(true, false, Some("X".to_string()))).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["FrameType"], json!("DataSetCompletion"));
        assert_eq!(value["HasErrors"], json!(true));
        assert_eq!(value["Exception"], json!("X"));
    }

    #[test]
    fn test_encode_unknown_frame() {
        let frame = Frame::Unknown {
            frame_type: "Future".to_string(),
        };
        let bytes = encode_frame(&frame).unwrap();
        assert_eq!(decode_frame(&bytes).unwrap(), frame);
    }
}
