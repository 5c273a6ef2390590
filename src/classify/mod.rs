mod backend;
mod backends;
mod result;

use anyhow::Result;

pub use backend::ClassifierBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use result::{softmax, ClassScore, Prediction};

use crate::config::FightwatchConfig;

/// Build a classifier backend by name.
///
/// `"stub"` is always available; `"tract"` needs the `backend-tract`
/// feature and a readable model file.
#[allow(unused_variables)]
pub fn backend_from_name(
    name: &str,
    model_path: &str,
    sequence_length: usize,
) -> Result<Box<dyn ClassifierBackend>> {
    match name {
        "stub" => Ok(Box::new(StubBackend::new(sequence_length))),
        "tract" => {
            #[cfg(feature = "backend-tract")]
            {
                let backend = TractBackend::new(model_path, sequence_length)?;
                Ok(Box::new(backend))
            }
            #[cfg(not(feature = "backend-tract"))]
            {
                anyhow::bail!("the tract backend requires the backend-tract feature")
            }
        }
        other => anyhow::bail!("unknown classifier backend '{}'", other),
    }
}

/// Build the classifier backend named by the configuration.
pub fn backend_from_config(cfg: &FightwatchConfig) -> Result<Box<dyn ClassifierBackend>> {
    backend_from_name(&cfg.backend, &cfg.model_path, cfg.clip.sequence_length)
}
