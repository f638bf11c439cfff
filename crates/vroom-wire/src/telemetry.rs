//! Telemetry encoding - wire format for face telemetry
//!
//! This is NOT a binary codec. The body is plain JSON so any peer
//! (including non-Rust clients) can read it:
//!
//! ```json
//! {"blendshapes":[{"categoryName":"jawOpen","score":0.42}],
//!  "rotation":{"x":0.01,"y":-0.2,"z":0.0}}
//! ```

use std::collections::HashSet;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use vroom_core::{BlendshapeSample, Rotation, TelemetryPayload};

use crate::{CodecError, CodecResult};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BlendshapeOut<'a> {
    category_name: &'a str,
    score: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlendshapeIn {
    category_name: String,
    score: f32,
}

#[derive(Serialize, Deserialize)]
struct RotationWire {
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Serialize)]
struct TelemetryOut<'a> {
    blendshapes: Vec<BlendshapeOut<'a>>,
    rotation: RotationWire,
}

#[derive(Deserialize)]
struct TelemetryIn {
    blendshapes: Vec<BlendshapeIn>,
    rotation: RotationWire,
}

/// Telemetry codec
pub struct TelemetryCodec;

impl TelemetryCodec {
    /// Encode a payload to a JSON body
    pub fn encode(payload: &TelemetryPayload) -> CodecResult<Bytes> {
        let rotation = payload.rotation();
        if !rotation.is_finite() {
            return Err(CodecError::NonFinite("rotation"));
        }
        if payload.blendshapes().iter().any(|b| !b.score.is_finite()) {
            return Err(CodecError::NonFinite("blendshape score"));
        }
        validate_blendshapes(payload.blendshapes().iter().map(|b| (b.category_name.as_str(), b.score)))?;

        let body = TelemetryOut {
            blendshapes: payload
                .blendshapes()
                .iter()
                .map(|b| BlendshapeOut {
                    category_name: &b.category_name,
                    score: b.score,
                })
                .collect(),
            rotation: RotationWire {
                x: rotation.x,
                y: rotation.y,
                z: rotation.z,
            },
        };

        Ok(Bytes::from(serde_json::to_vec(&body)?))
    }

    /// Decode a JSON body into a payload
    pub fn decode(data: &[u8]) -> CodecResult<TelemetryPayload> {
        let body: TelemetryIn = serde_json::from_slice(data)?;

        validate_blendshapes(
            body.blendshapes
                .iter()
                .map(|b| (b.category_name.as_str(), b.score)),
        )?;

        let blendshapes = body
            .blendshapes
            .into_iter()
            .map(|b| BlendshapeSample {
                category_name: b.category_name,
                score: b.score,
            })
            .collect();

        Ok(TelemetryPayload::new(
            blendshapes,
            Rotation::new(body.rotation.x, body.rotation.y, body.rotation.z),
        ))
    }
}

fn validate_blendshapes<'a>(samples: impl Iterator<Item = (&'a str, f32)>) -> CodecResult<()> {
    let mut seen = HashSet::new();
    for (category, score) in samples {
        if category.is_empty() {
            return Err(CodecError::EmptyField("categoryName"));
        }
        if !(0.0..=1.0).contains(&score) {
            return Err(CodecError::ScoreOutOfRange {
                category: category.to_string(),
                score,
            });
        }
        if !seen.insert(category) {
            return Err(CodecError::DuplicateCategory(category.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_payload() -> TelemetryPayload {
        TelemetryPayload::new(
            vec![
                BlendshapeSample::new("jawOpen", 0.42),
                BlendshapeSample::new("eyeBlinkLeft", 0.05),
                BlendshapeSample::new("mouthSmileRight", 1.0),
            ],
            Rotation::new(0.1, -0.25, 3.0e-3),
        )
    }

    #[test]
    fn test_encode_field_names() {
        let encoded = TelemetryCodec::encode(&sample_payload()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&encoded).unwrap();

        assert_eq!(json["blendshapes"][0]["categoryName"], "jawOpen");
        assert!(json["blendshapes"][0]["score"].is_number());
        assert_eq!(json["rotation"]["y"], -0.25);
    }

    #[test]
    fn test_roundtrip_is_exact() {
        let payload = sample_payload();
        let decoded = TelemetryCodec::decode(&TelemetryCodec::encode(&payload).unwrap()).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_decode_accepts_foreign_client_body() {
        let body = br#"{"blendshapes":[{"categoryName":"_neutral","score":0.9,"index":0,"displayName":""}],
                        "rotation":{"x":0,"y":0,"z":0,"order":"XYZ"}}"#;
        let payload = TelemetryCodec::decode(body).unwrap();
        assert_eq!(payload.score("_neutral"), Some(0.9));
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        assert!(TelemetryCodec::decode(br#"{"blendshapes":[]}"#).is_err());
        assert!(TelemetryCodec::decode(br#"{"rotation":{"x":0,"y":0,"z":0}}"#).is_err());
        assert!(TelemetryCodec::decode(br#"{"blendshapes":[{"score":0.1}],"rotation":{"x":0,"y":0,"z":0}}"#).is_err());
        assert!(TelemetryCodec::decode(br#"{"blendshapes":[],"rotation":{"x":0,"y":0}}"#).is_err());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(TelemetryCodec::decode(b""), Err(CodecError::Malformed(_))));
        assert!(matches!(TelemetryCodec::decode(&[0xff, 0xfe, 0x00]), Err(CodecError::Malformed(_))));
        assert!(TelemetryCodec::decode(b"null").is_err());
        assert!(TelemetryCodec::decode(br#"{"blendshapes":"nope","rotation":{}}"#).is_err());
    }

    #[test]
    fn test_decode_rejects_truncated_body() {
        let encoded = TelemetryCodec::encode(&sample_payload()).unwrap();
        for cut in [1, encoded.len() / 2, encoded.len() - 1] {
            assert!(TelemetryCodec::decode(&encoded[..cut]).is_err());
        }
    }

    #[test]
    fn test_decode_rejects_invalid_samples() {
        let out_of_range = br#"{"blendshapes":[{"categoryName":"jawOpen","score":1.5}],"rotation":{"x":0,"y":0,"z":0}}"#;
        assert!(matches!(
            TelemetryCodec::decode(out_of_range),
            Err(CodecError::ScoreOutOfRange { .. })
        ));

        let duplicate = br#"{"blendshapes":[{"categoryName":"a","score":0.1},{"categoryName":"a","score":0.2}],"rotation":{"x":0,"y":0,"z":0}}"#;
        assert_eq!(
            TelemetryCodec::decode(duplicate),
            Err(CodecError::DuplicateCategory("a".to_string()))
        );
    }

    #[test]
    fn test_encode_rejects_non_finite() {
        let payload = TelemetryPayload::new(vec![], Rotation::new(f64::NAN, 0.0, 0.0));
        assert_eq!(
            TelemetryCodec::encode(&payload),
            Err(CodecError::NonFinite("rotation"))
        );
    }

    fn arb_payload() -> impl Strategy<Value = TelemetryPayload> {
        (
            proptest::collection::btree_map("[a-zA-Z_]{1,16}", 0.0f32..=1.0, 0..60),
            -std::f64::consts::PI..std::f64::consts::PI,
            -std::f64::consts::PI..std::f64::consts::PI,
            -std::f64::consts::PI..std::f64::consts::PI,
        )
            .prop_map(|(shapes, x, y, z)| {
                TelemetryPayload::new(
                    shapes
                        .into_iter()
                        .map(|(name, score)| BlendshapeSample::new(name, score))
                        .collect(),
                    Rotation::new(x, y, z),
                )
            })
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(payload in arb_payload()) {
            let encoded = TelemetryCodec::encode(&payload).unwrap();
            let decoded = TelemetryCodec::decode(&encoded).unwrap();
            prop_assert_eq!(decoded.rotation(), payload.rotation());
            prop_assert_eq!(decoded.blendshapes().len(), payload.blendshapes().len());
            for (a, b) in decoded.blendshapes().iter().zip(payload.blendshapes()) {
                prop_assert_eq!(&a.category_name, &b.category_name);
                prop_assert!((a.score - b.score).abs() <= f32::EPSILON);
            }
        }

        #[test]
        fn prop_decode_never_panics(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            let _ = TelemetryCodec::decode(&data);
        }
    }
}
