//! Artifact encoding: one pretty-printed JSON object with a field per
//! collection.

use std::io::{Read, Write};

use crate::error::Result;
use crate::models::ModelSet;

use super::Snapshot;

/// Write `snapshot` as pretty JSON followed by a newline.
pub fn encode<M: ModelSet>(snapshot: &Snapshot<M>, mut writer: impl Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, snapshot)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

pub fn to_bytes<M: ModelSet>(snapshot: &Snapshot<M>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode(snapshot, &mut buf)?;
    Ok(buf)
}

/// Strict decode: unknown fields and missing required fields are errors, as
/// are ids of the wrong type for `M`.
pub fn decode<M: ModelSet>(bytes: &[u8]) -> Result<Snapshot<M>> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Read the whole of `reader`, then decode.
pub fn read<M: ModelSet>(mut reader: impl Read) -> Result<Snapshot<M>> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    decode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SnapError;
    use crate::models::{CrdbModels, PostgresModels};
    use crate::test_utils::fixtures;

    #[test]
    fn encoding_is_pretty_and_deterministic() {
        let snapshot = fixtures::snapshot::<CrdbModels>();
        let first = to_bytes(&snapshot).unwrap();
        let second = to_bytes(&snapshot).unwrap();
        assert_eq!(first, second);
        let text = String::from_utf8(first).unwrap();
        assert!(text.starts_with("{\n  \"application_types\": ["));
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn decode_restores_the_snapshot() {
        let snapshot = fixtures::snapshot::<PostgresModels>();
        let decoded: Snapshot<PostgresModels> = decode(&to_bytes(&snapshot).unwrap()).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn unknown_top_level_field_is_rejected() {
        let mut json = serde_json::to_value(Snapshot::<CrdbModels>::default()).unwrap();
        json["sessions"] = serde_json::json!([]);
        let bytes = serde_json::to_vec(&json).unwrap();
        assert!(matches!(
            decode::<CrdbModels>(&bytes),
            Err(SnapError::Serialization(_))
        ));
    }

    #[test]
    fn missing_collection_is_rejected() {
        let mut json = serde_json::to_value(Snapshot::<CrdbModels>::default()).unwrap();
        json.as_object_mut().unwrap().remove("users");
        let bytes = serde_json::to_vec(&json).unwrap();
        assert!(decode::<CrdbModels>(&bytes).is_err());
    }

    #[test]
    fn crdb_artifact_does_not_decode_as_postgres() {
        let bytes = to_bytes(&fixtures::snapshot::<CrdbModels>()).unwrap();
        assert!(decode::<PostgresModels>(&bytes).is_err());
    }

    #[test]
    fn truncated_input_is_an_error() {
        let bytes = to_bytes(&fixtures::snapshot::<CrdbModels>()).unwrap();
        assert!(read::<CrdbModels>(&bytes[..bytes.len() / 2]).is_err());
    }
}
