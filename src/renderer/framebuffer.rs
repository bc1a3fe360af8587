use std::fs;
use std::path::Path;

use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::{BLACK, Radiance};

/// Sidecar metadata written next to every checkpoint image.
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckpointMeta {
    pub samples: u32,
    pub width: u32,
    pub height: u32,
    pub color_space: String,
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("failed to access checkpoint file")]
    Io(#[from] std::io::Error),
    #[error("failed to decode checkpoint image")]
    Image(#[from] image::ImageError),
    #[error("failed to parse checkpoint metadata")]
    Meta(#[from] serde_json::Error),
    #[error("checkpoint is {found_width}x{found_height}, render is {width}x{height}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        found_width: u32,
        found_height: u32,
    },
}

/// Accumulation buffer for the render. Stores per-pixel radiance sums;
/// the displayed value is `sum / samples`, which stays the correct
/// running mean across checkpointed resumes.
pub struct Framebuffer {
    width: u32,
    height: u32,
    samples: u32,
    data: Vec<Radiance>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Framebuffer {
        Framebuffer {
            width,
            height,
            samples: 0,
            data: vec![BLACK; (width * height) as usize],
        }
    }

    fn from_mean(width: u32, height: u32, samples: u32, mean: Vec<Radiance>) -> Framebuffer {
        assert!(mean.len() == (width * height) as usize);
        Framebuffer {
            width,
            height,
            samples,
            data: mean.into_iter().map(|m| m * samples as f32).collect(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Samples accumulated per pixel so far.
    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn add_samples(&mut self, samples: u32) {
        self.samples += samples;
    }

    /// Adds per-pixel radiance sums into row `y`.
    pub fn merge_row(&mut self, y: u32, sums: &[Radiance]) {
        assert!(sums.len() == self.width as usize);
        let start = (y * self.width) as usize;
        for (pixel, sum) in self.data[start..start + self.width as usize]
            .iter_mut()
            .zip(sums)
        {
            *pixel += *sum;
        }
    }

    pub fn mean_pixel(&self, x: u32, y: u32) -> Radiance {
        let sum = self.data[(y * self.width + x) as usize];
        if self.samples == 0 {
            BLACK
        } else {
            sum / self.samples as f32
        }
    }

    /// 8-bit encoding of the running mean, `value * 255` clamped.
    pub fn to_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let mean = self.mean_pixel(x, y);
            Rgb([
                encode_channel(mean.r),
                encode_channel(mean.g),
                encode_channel(mean.b),
            ])
        })
    }

    /// Writes the image and its metadata sidecar.
    pub fn save(&self, path: &Path) -> Result<(), CheckpointError> {
        self.to_image().save(path)?;
        let meta = CheckpointMeta {
            samples: self.samples,
            width: self.width,
            height: self.height,
            color_space: "linear-rgb".to_owned(),
        };
        fs::write(sidecar_path(path), serde_json::to_vec_pretty(&meta)?)?;
        Ok(())
    }

    /// Restores an accumulation buffer from a previous run's output.
    ///
    /// The sample count comes from the JSON sidecar when present, else
    /// from the legacy trailing `-N` token in the file stem. Without
    /// either, the checkpoint is discarded with a warning and a fresh
    /// buffer is returned.
    pub fn load_checkpoint(
        path: &Path,
        width: u32,
        height: u32,
    ) -> Result<Framebuffer, CheckpointError> {
        let samples = match load_sidecar(path)? {
            Some(meta) => {
                if (meta.width, meta.height) != (width, height) {
                    return Err(CheckpointError::DimensionMismatch {
                        width,
                        height,
                        found_width: meta.width,
                        found_height: meta.height,
                    });
                }
                meta.samples
            }
            None => match legacy_sample_count(path) {
                Some(samples) => samples,
                None => {
                    log::warn!(
                        "checkpoint {} carries no sample count, starting fresh",
                        path.display()
                    );
                    return Ok(Framebuffer::new(width, height));
                }
            },
        };

        let image = image::open(path)?.into_rgb8();
        if image.dimensions() != (width, height) {
            let (found_width, found_height) = image.dimensions();
            return Err(CheckpointError::DimensionMismatch {
                width,
                height,
                found_width,
                found_height,
            });
        }

        let mean = image
            .pixels()
            .map(|Rgb([r, g, b])| {
                Radiance::new(
                    *r as f32 / 255.0,
                    *g as f32 / 255.0,
                    *b as f32 / 255.0,
                )
            })
            .collect();
        Ok(Framebuffer::from_mean(width, height, samples, mean))
    }
}

fn encode_channel(value: f32) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

fn sidecar_path(path: &Path) -> std::path::PathBuf {
    path.with_extension("json")
}

fn load_sidecar(path: &Path) -> Result<Option<CheckpointMeta>, CheckpointError> {
    match fs::read(sidecar_path(path)) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// Sample count from the `-N` suffix of the file stem, as written by
/// older renders.
fn legacy_sample_count(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    let (_, suffix) = stem.rsplit_once('-')?;
    suffix.parse().ok()
}
