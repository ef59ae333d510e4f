//! PNG export with embedded metadata (tEXt chunks).

use std::io::BufWriter;
use std::path::Path;

use tracing::debug;

use mandelmaps_core::{Complex, FractalFamily, ViewportState};

use crate::buffer::PixelBuffer;

/// Metadata to embed in an exported PNG as tEXt chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportMetadata {
    pub family: FractalFamily,
    pub center: Complex,
    pub pixel_size: f64,
    pub max_iterations: u32,
    pub julia_c: Option<Complex>,
    pub color_scheme: String,
    pub width: u32,
    pub height: u32,
}

impl ExportMetadata {
    pub fn from_viewport(viewport: &ViewportState, color_scheme: &str) -> Self {
        Self {
            family: viewport.fractal().family(),
            center: viewport.center(),
            pixel_size: viewport.pixel_size(),
            max_iterations: viewport.max_iterations(),
            julia_c: viewport.fractal().julia_c(),
            color_scheme: color_scheme.to_string(),
            width: viewport.width(),
            height: viewport.height(),
        }
    }
}

/// Write the buffer's colours as an RGBA PNG with embedded view metadata.
///
/// Uses the `png` crate directly to inject tEXt chunks readable by exiftool
/// and most image viewers.
pub fn export_png(buffer: &PixelBuffer, path: &Path, metadata: &ExportMetadata) -> crate::Result<()> {
    let pixels = buffer.to_rgba();
    let file = std::fs::File::create(path)?;
    let writer = BufWriter::new(file);

    let mut encoder = png::Encoder::new(writer, buffer.width(), buffer.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(png::Compression::Default);

    encoder.add_text_chunk("Software".to_string(), "MandelMaps".to_string())?;
    encoder.add_text_chunk("Description".to_string(), build_description(metadata))?;
    for (key, value) in build_metadata_pairs(metadata) {
        encoder.add_text_chunk(key, value)?;
    }

    let mut png_writer = encoder.write_header()?;
    png_writer.write_image_data(&pixels)?;
    png_writer.finish()?;

    debug!(
        width = buffer.width(),
        height = buffer.height(),
        path = %path.display(),
        "Exported PNG"
    );
    Ok(())
}

fn build_description(meta: &ExportMetadata) -> String {
    let mut desc = format!(
        "{} - Center: {}, Pixel size: {:e}, Iterations: {}",
        meta.family, meta.center, meta.pixel_size, meta.max_iterations,
    );
    if let Some(c) = meta.julia_c {
        desc.push_str(&format!(", Julia C: {c}"));
    }
    desc
}

fn build_metadata_pairs(meta: &ExportMetadata) -> Vec<(String, String)> {
    let mut pairs = vec![
        ("MandelMaps.Family".into(), meta.family.label().to_string()),
        ("MandelMaps.CenterRe".into(), meta.center.re.to_string()),
        ("MandelMaps.CenterIm".into(), meta.center.im.to_string()),
        ("MandelMaps.PixelSize".into(), format!("{:e}", meta.pixel_size)),
        ("MandelMaps.MaxIterations".into(), meta.max_iterations.to_string()),
        ("MandelMaps.ColorScheme".into(), meta.color_scheme.clone()),
        ("MandelMaps.Resolution".into(), format!("{}x{}", meta.width, meta.height)),
    ];
    if let Some(c) = meta.julia_c {
        pairs.push(("MandelMaps.JuliaC_Re".into(), c.re.to_string()));
        pairs.push(("MandelMaps.JuliaC_Im".into(), c.im.to_string()));
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use mandelmaps_core::FractalKernel;
    use std::io::Read;

    fn filled_buffer(w: u32, h: u32, argb: u32) -> PixelBuffer {
        let buffer = PixelBuffer::new(w, h);
        for idx in 0..buffer.len() {
            buffer.set_color(idx, argb);
        }
        buffer
    }

    #[test]
    fn export_creates_valid_png() {
        let buffer = filled_buffer(4, 4, 0xFF80_8080);
        let viewport =
            ViewportState::new(-2.0, 1.0, 0.5, 4, 4, 256, FractalKernel::Mandelbrot).unwrap();
        let meta = ExportMetadata::from_viewport(&viewport, "cosine-ramp");

        let dir = std::env::temp_dir().join("mandelmaps_test_export");
        let _ = std::fs::create_dir_all(&dir);
        let path = dir.join("test_export.png");
        export_png(&buffer, &path, &meta).expect("export should succeed");

        let mut file = std::fs::File::open(&path).expect("file should exist");
        let mut header = [0u8; 8];
        file.read_exact(&mut header).expect("should read header");
        assert_eq!(&header, b"\x89PNG\r\n\x1a\n", "valid PNG signature");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn export_embeds_text_chunks_and_pixels() {
        let buffer = filled_buffer(2, 2, 0xFF10_2030);
        let viewport =
            ViewportState::new(-1.0, 1.0, 1.0, 2, 2, 100, FractalKernel::julia(-0.7, 0.27015))
                .unwrap();
        let meta = ExportMetadata::from_viewport(&viewport, "spiral");

        let dir = std::env::temp_dir().join("mandelmaps_test_export_meta");
        let _ = std::fs::create_dir_all(&dir);
        let path = dir.join("test_meta.png");
        export_png(&buffer, &path, &meta).expect("export should succeed");

        let decoder = png::Decoder::new(std::fs::File::open(&path).expect("file should exist"));
        let mut reader = decoder.read_info().expect("should read info");
        {
            let texts = &reader.info().uncompressed_latin1_text;
            assert!(
                texts.iter().any(|t| t.keyword == "Software" && t.text == "MandelMaps"),
                "Should contain Software text chunk"
            );
            assert!(
                texts.iter().any(|t| t.keyword == "MandelMaps.Family" && t.text == "Julia"),
                "Should contain family chunk"
            );
            assert!(
                texts.iter().any(|t| t.keyword == "MandelMaps.JuliaC_Re" && t.text == "-0.7"),
                "Should contain Julia C Re chunk"
            );
            assert!(texts
                .iter()
                .any(|t| t.keyword == "MandelMaps.ColorScheme" && t.text == "spiral"));
        }

        let mut data = vec![0u8; reader.output_buffer_size()];
        let frame = reader.next_frame(&mut data).expect("should decode");
        assert_eq!(&data[..frame.buffer_size()][..4], &[0x10, 0x20, 0x30, 0xFF]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn description_mentions_julia_parameter() {
        let viewport =
            ViewportState::new(-1.0, 1.0, 0.01, 10, 10, 50, FractalKernel::julia(0.25, -0.5))
                .unwrap();
        let desc = build_description(&ExportMetadata::from_viewport(&viewport, "x"));
        assert!(desc.starts_with("Julia"), "{desc}");
        assert!(desc.contains("Julia C: 0.25 - 0.5i"), "{desc}");
    }
}
