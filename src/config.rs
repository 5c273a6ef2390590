use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_MODEL_PATH: &str = "fightwatch.onnx";
const DEFAULT_BACKEND: &str = "tract";
const DEFAULT_OUTPUT_DIR: &str = "alerts";
const DEFAULT_STREAM_URL: &str = "stub://moving";
const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 2500;
const DEFAULT_QUEUE_DEPTH: usize = 2;
const DEFAULT_SEQUENCE_LENGTH: usize = crate::DEFAULT_SEQUENCE_LENGTH;
const DEFAULT_SKIP: usize = 2;

#[derive(Debug, Deserialize, Default)]
struct FightwatchConfigFile {
    model_path: Option<String>,
    backend: Option<String>,
    output_dir: Option<String>,
    stream: Option<StreamConfigFile>,
    clip: Option<ClipConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct StreamConfigFile {
    url: Option<String>,
    sample_interval_ms: Option<u64>,
    queue_depth: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct ClipConfigFile {
    sequence_length: Option<usize>,
    skip: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct FightwatchConfig {
    pub model_path: String,
    pub backend: String,
    pub output_dir: String,
    pub stream: StreamSettings,
    pub clip: ClipSettings,
}

#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub url: String,
    pub sample_interval: Duration,
    pub queue_depth: usize,
}

#[derive(Debug, Clone)]
pub struct ClipSettings {
    pub sequence_length: usize,
    pub skip: usize,
}

impl FightwatchConfig {
    /// Load from the JSON file named by `FIGHTWATCH_CONFIG` (when set),
    /// apply `FIGHTWATCH_*` environment overrides, then validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("FIGHTWATCH_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: FightwatchConfigFile) -> Self {
        let model_path = file
            .model_path
            .unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string());
        let backend = file.backend.unwrap_or_else(|| DEFAULT_BACKEND.to_string());
        let output_dir = file
            .output_dir
            .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string());
        let stream = StreamSettings {
            url: file
                .stream
                .as_ref()
                .and_then(|stream| stream.url.clone())
                .unwrap_or_else(|| DEFAULT_STREAM_URL.to_string()),
            sample_interval: Duration::from_millis(
                file.stream
                    .as_ref()
                    .and_then(|stream| stream.sample_interval_ms)
                    .unwrap_or(DEFAULT_SAMPLE_INTERVAL_MS),
            ),
            queue_depth: file
                .stream
                .as_ref()
                .and_then(|stream| stream.queue_depth)
                .unwrap_or(DEFAULT_QUEUE_DEPTH),
        };
        let clip = ClipSettings {
            sequence_length: file
                .clip
                .as_ref()
                .and_then(|clip| clip.sequence_length)
                .unwrap_or(DEFAULT_SEQUENCE_LENGTH),
            skip: file
                .clip
                .as_ref()
                .and_then(|clip| clip.skip)
                .unwrap_or(DEFAULT_SKIP),
        };
        Self {
            model_path,
            backend,
            output_dir,
            stream,
            clip,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("FIGHTWATCH_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.model_path = path;
            }
        }
        if let Ok(backend) = std::env::var("FIGHTWATCH_BACKEND") {
            if !backend.trim().is_empty() {
                self.backend = backend;
            }
        }
        if let Ok(dir) = std::env::var("FIGHTWATCH_OUTPUT_DIR") {
            if !dir.trim().is_empty() {
                self.output_dir = dir;
            }
        }
        if let Ok(url) = std::env::var("FIGHTWATCH_STREAM_URL") {
            if !url.trim().is_empty() {
                self.stream.url = url;
            }
        }
        if let Ok(interval) = std::env::var("FIGHTWATCH_SAMPLE_INTERVAL_MS") {
            let millis: u64 = interval.parse().map_err(|_| {
                anyhow!("FIGHTWATCH_SAMPLE_INTERVAL_MS must be an integer number of milliseconds")
            })?;
            self.stream.sample_interval = Duration::from_millis(millis);
        }
        if let Ok(length) = std::env::var("FIGHTWATCH_SEQUENCE_LENGTH") {
            self.clip.sequence_length = length
                .parse()
                .map_err(|_| anyhow!("FIGHTWATCH_SEQUENCE_LENGTH must be an integer"))?;
        }
        if let Ok(skip) = std::env::var("FIGHTWATCH_SKIP") {
            self.clip.skip = skip
                .parse()
                .map_err(|_| anyhow!("FIGHTWATCH_SKIP must be an integer"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        match self.backend.as_str() {
            "tract" | "stub" => {}
            other => return Err(anyhow!("unknown classifier backend '{}'", other)),
        }
        if self.backend == "tract" && self.model_path.trim().is_empty() {
            return Err(anyhow!("the tract backend needs a model path"));
        }
        if self.clip.sequence_length == 0 {
            return Err(anyhow!("sequence length must be greater than zero"));
        }
        if self.clip.skip == 0 {
            return Err(anyhow!("skip factor must be greater than zero"));
        }
        if self.stream.queue_depth == 0 {
            return Err(anyhow!("queue depth must be greater than zero"));
        }
        if self.stream.sample_interval.is_zero() {
            return Err(anyhow!("sample interval must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<FightwatchConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
