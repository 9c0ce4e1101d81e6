use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::labels::LabelSchema;
use crate::math::tensor::Shape;
use crate::nn::builder::ModelVariant;
use crate::nn::network::Network;

/// Bump when the artifact layout changes incompatibly.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// A persisted model: architecture and weights bundled with the label schema
/// they were trained against and a tag naming the architecture variant.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelFile {
    pub format_version: u32,
    pub variant: ModelVariant,
    pub schema: LabelSchema,
    pub input_shape: Shape,
    pub network: Network,
}

/// Borrowing mirror of [`ModelFile`] so a checkpoint can be written without
/// cloning the network mid-training.
#[derive(Serialize)]
struct ModelFileRef<'a> {
    format_version: u32,
    variant: ModelVariant,
    schema: &'a LabelSchema,
    input_shape: Shape,
    network: &'a Network,
}

/// Writes a model artifact as pretty-printed JSON.
pub fn save_model(
    path: &Path,
    variant: ModelVariant,
    schema: &LabelSchema,
    input_shape: Shape,
    network: &Network,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(
        writer,
        &ModelFileRef {
            format_version: ARTIFACT_FORMAT_VERSION,
            variant,
            schema,
            input_shape,
            network,
        },
    )?;
    Ok(())
}

/// Loads a model artifact and validates its format version and label schema.
/// A schema that does not match the compiled-in label ordering is an error:
/// softmax indices from such a model would silently mean the wrong labels.
pub fn load_model(path: &Path) -> Result<ModelFile> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let model: ModelFile = serde_json::from_reader(reader)?;
    if model.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(Error::InvalidModel(format!(
            "unsupported artifact format version {}",
            model.format_version
        )));
    }
    model.schema.validate()?;
    if model.network.layers.is_empty() {
        return Err(Error::InvalidModel("model has no layers".to_owned()));
    }
    Ok(model)
}
