use crate::error::{Error, Result};
use crate::math::matrix::Matrix;
use crate::model::autoencoder::AutoEncoder;

/// Runs every sequence through the encoder sub-model only and returns one
/// row of latent codes per case. Temporal codes are flattened row-major.
pub fn encode(model: &AutoEncoder, sequences: &[Matrix]) -> Result<Matrix> {
    let encoder = model.encoder()?;
    let input_shape = model.input_shape()?;

    let mut rows = Vec::with_capacity(sequences.len());
    for seq in sequences {
        if seq.shape() != input_shape {
            return Err(Error::ShapeMismatch {
                expected: vec![input_shape.0, input_shape.1],
                got: vec![seq.rows, seq.cols],
            });
        }
        rows.push(encoder.predict(seq).flatten());
    }
    Ok(Matrix::from_data(rows))
}
