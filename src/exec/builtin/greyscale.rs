// src/exec/builtin/greyscale.rs

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::exec::backend::{BoxFuture, CANCELLED_MESSAGE, ExecutionContext, Executor};
use crate::task::TaskKind;

const PROGRESS_STEPS: usize = 10;

/// Raw RGBA image, four bytes per pixel, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RgbaImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RgbaImage {
    fn expected_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(4)
    }
}

/// Replaces every pixel's colour channels by their average.
#[derive(Debug, Clone)]
pub struct GreyscaleExecutor {
    step_delay: Duration,
}

impl GreyscaleExecutor {
    pub fn new(step_delay: Duration) -> Self {
        Self { step_delay }
    }
}

impl Executor for GreyscaleExecutor {
    fn kind(&self) -> TaskKind {
        TaskKind::ImageToGreyscale
    }

    fn execute(&self, mut ctx: ExecutionContext) -> BoxFuture<()> {
        let delay = self.step_delay;

        Box::pin(async move {
            let mut image: RgbaImage = match serde_json::from_value(ctx.input().clone()) {
                Ok(image) => image,
                Err(err) => {
                    ctx.fail(format!("invalid image input: {err}")).await;
                    return;
                }
            };

            if image.expected_len() != Some(image.pixels.len()) {
                ctx.fail(format!(
                    "image is {}x{} but has {} bytes of RGBA data",
                    image.width,
                    image.height,
                    image.pixels.len()
                ))
                .await;
                return;
            }

            let pixel_count = image.pixels.len() / 4;
            let chunk = pixel_count.div_ceil(PROGRESS_STEPS).max(1) * 4;
            let mut done = 0usize;

            for block in image.pixels.chunks_mut(chunk) {
                block.chunks_exact_mut(4).for_each(grey_pixel);
                done += block.len() / 4;

                ctx.progress(done as f64 * 100.0 / pixel_count as f64).await;
                if ctx.pause(delay).await {
                    ctx.fail(CANCELLED_MESSAGE).await;
                    return;
                }
            }

            match serde_json::to_value(&image) {
                Ok(result) => ctx.succeed(result).await,
                Err(err) => ctx.fail(format!("encoding image failed: {err}")).await,
            }
        })
    }
}

/// Greyscale conversion without progress reporting.
pub fn to_greyscale(image: &RgbaImage) -> RgbaImage {
    let mut out = image.clone();
    out.pixels.chunks_exact_mut(4).for_each(grey_pixel);
    out
}

fn grey_pixel(px: &mut [u8]) {
    let avg = ((u16::from(px[0]) + u16::from(px[1]) + u16::from(px[2])) / 3) as u8;
    px[..3].fill(avg);
}
