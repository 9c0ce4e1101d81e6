use serde_json::{json, Value};

use crate::error::Error;
use crate::infer::{EmotionModel, Predictor};
use crate::serve::multipart;

/// Handles a `POST /predict-emotion` upload: parses the multipart body,
/// runs the full detection + classification pipeline, and reports the first
/// region's prediction. Returns (status, JSON body).
///
/// Client mistakes (wrong content type, no file, unreadable image) come back
/// as 400 with an `error` message; anything else is a 500.
pub fn predict_upload<M: EmotionModel>(
    predictor: &mut Predictor<M>,
    content_type: Option<&str>,
    body: &[u8],
) -> (u16, Value) {
    let boundary = match content_type.and_then(multipart::extract_boundary) {
        Some(b) => b,
        None => {
            return (
                400,
                json!({ "error": "expected a multipart/form-data upload" }),
            )
        }
    };

    let file = match multipart::extract_file_part(body, &boundary) {
        Some(f) => f,
        None => return (400, json!({ "error": "no file found in upload" })),
    };

    match predictor.predict_bytes(&file) {
        Ok((_, predictions)) => match predictions.first() {
            Some(prediction) => match serde_json::to_value(prediction) {
                Ok(value) => (200, value),
                Err(e) => (500, json!({ "error": e.to_string() })),
            },
            None => (500, json!({ "error": "no prediction produced" })),
        },
        Err(Error::ImageDecode(_)) => (400, json!({ "error": "could not read image" })),
        Err(e) => (500, json!({ "error": e.to_string() })),
    }
}

/// Body for `GET /`.
pub fn index() -> Value {
    json!({
        "message": "emotion recognition API",
        "endpoints": { "predict": "POST /predict-emotion" },
    })
}
