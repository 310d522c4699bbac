use crate::error::EncodingFailure;
use crate::result::TicketResult;
use qrcode::{Color, QrCode};

/// A machine-readable raster encoding of a short identity token. Built fresh
/// for every render; the raster is square, row-major, 8-bit greyscale with
/// 0x00 dark modules on a 0xFF background.
pub struct ScannableCode {
    token: String,
    width: usize,
    pixels: Vec<u8>,
}

impl ScannableCode {
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Side length in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Encoding capability. Deterministic for a given input; fails only on
/// malformed or oversized input.
pub trait CodeEncoder {
    fn encode(&self, token: &str) -> TicketResult<ScannableCode>;
}

/// QR implementation of [`CodeEncoder`].
pub struct QrCodeEncoder {
    module_px: usize,
    quiet_modules: usize,
}

impl QrCodeEncoder {
    pub fn new() -> QrCodeEncoder {
        QrCodeEncoder {
            module_px: 8,
            quiet_modules: 4,
        }
    }
}

impl Default for QrCodeEncoder {
    fn default() -> QrCodeEncoder {
        QrCodeEncoder::new()
    }
}

impl CodeEncoder for QrCodeEncoder {
    fn encode(&self, token: &str) -> TicketResult<ScannableCode> {
        let code = QrCode::new(token.as_bytes()).or_else(|source| {
            EncodingFailure {
                token,
                message: source.to_string(),
            }
            .fail()
        })?;

        let modules = code.width();
        let colors = code.to_colors();
        let width = (modules + 2 * self.quiet_modules) * self.module_px;
        let mut pixels = vec![0xffu8; width * width];

        for row in 0..modules {
            for col in 0..modules {
                if colors[row * modules + col] != Color::Dark {
                    continue;
                }
                let top = (row + self.quiet_modules) * self.module_px;
                let left = (col + self.quiet_modules) * self.module_px;
                for y in top..top + self.module_px {
                    let offset = y * width + left;
                    for px in &mut pixels[offset..offset + self.module_px] {
                        *px = 0x00;
                    }
                }
            }
        }

        Ok(ScannableCode {
            token: token.to_string(),
            width,
            pixels,
        })
    }
}
