use crate::error::DiecutError;
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};
use qrcode::{EcLevel, QrCode};

/// Fixed edge length of the raster handed to the PDF writer. Labels are
/// small; this keeps module edges crisp at any physical QR size.
pub const QR_RASTER_SAMPLES: u32 = 1400;

/// Quiet zone around the symbol, in modules.
const QUIET_MODULES: usize = 1;

const DARK: Luma<u8> = Luma([0]);
const LIGHT: Luma<u8> = Luma([255]);

/// Encodes one label payload into a square grayscale raster: error
/// correction level M, 1-module quiet border, integer module scale, then a
/// nearest-neighbor resize to exactly `QR_RASTER_SAMPLES`.
pub fn encode_badge(data: &str) -> Result<GrayImage, DiecutError> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::M)
        .map_err(|err| DiecutError::QrEncode(err.to_string()))?;

    let modules = code.width();
    let colors = code.to_colors();
    let total = modules + 2 * QUIET_MODULES;
    let scale = (QR_RASTER_SAMPLES as usize / total).max(1);
    let native = (total * scale) as u32;

    let mut img = GrayImage::from_pixel(native, native, LIGHT);
    for (index, color) in colors.iter().enumerate() {
        if *color != qrcode::Color::Dark {
            continue;
        }
        let mx = (index % modules + QUIET_MODULES) * scale;
        let my = (index / modules + QUIET_MODULES) * scale;
        for dy in 0..scale {
            for dx in 0..scale {
                img.put_pixel((mx + dx) as u32, (my + dy) as u32, DARK);
            }
        }
    }

    if native != QR_RASTER_SAMPLES {
        img = imageops::resize(&img, QR_RASTER_SAMPLES, QR_RASTER_SAMPLES, FilterType::Nearest);
    }
    Ok(img)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raster_has_the_fixed_edge_length() {
        let img = encode_badge("ASN00001").unwrap();
        assert_eq!(img.width(), QR_RASTER_SAMPLES);
        assert_eq!(img.height(), QR_RASTER_SAMPLES);
    }

    #[test]
    fn raster_is_bilevel_with_a_light_border() {
        let img = encode_badge("ASN00001").unwrap();
        assert!(img.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        // The quiet zone keeps every edge pixel light.
        let last = QR_RASTER_SAMPLES - 1;
        for i in 0..QR_RASTER_SAMPLES {
            assert_eq!(img.get_pixel(i, 0).0[0], 255);
            assert_eq!(img.get_pixel(i, last).0[0], 255);
            assert_eq!(img.get_pixel(0, i).0[0], 255);
            assert_eq!(img.get_pixel(last, i).0[0], 255);
        }
        // A finder pattern guarantees dark content away from the border.
        assert!(img.pixels().any(|p| p.0[0] == 0));
    }

    #[test]
    fn encoding_is_deterministic() {
        let a = encode_badge("ASN00042").unwrap();
        let b = encode_badge("ASN00042").unwrap();
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn payloads_differ_in_the_raster() {
        let a = encode_badge("ASN00001").unwrap();
        let b = encode_badge("ASN00002").unwrap();
        assert_ne!(a.as_raw(), b.as_raw());
    }
}
