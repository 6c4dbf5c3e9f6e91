//! Picking image files and keeping their preview textures alive.

use anyhow::{anyhow, Context, Result};
use eframe::egui;
use image::ImageFormat;
use shared::{Attachment, PreviewRef};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const THUMBNAIL_SIZE: u32 = 96;

/// Native multi-select dialog limited to images.
pub fn pick_images() -> Vec<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Upload images")
        .add_filter("Images", &["png", "jpg", "jpeg", "gif", "webp", "bmp"])
        .pick_files()
        .unwrap_or_default()
}

/// Media type from the file's magic bytes, not its extension.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    let mime = match image::guess_format(bytes).ok()? {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        _ => return None,
    };
    Some(mime)
}

/// Read an image file into an attachment plus a thumbnail for its chip.
pub fn load_image(path: &Path) -> Result<(Attachment, egui::ColorImage)> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let mime = sniff_mime(&bytes)
        .ok_or_else(|| anyhow!("{} is not a supported image", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string());

    let thumb = image::load_from_memory(&bytes)
        .with_context(|| format!("decoding {}", name))?
        .thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE)
        .to_rgba8();
    let size = [thumb.width() as usize, thumb.height() as usize];
    let pixels = thumb.as_flat_samples();
    let preview = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());

    Ok((Attachment::from_bytes(name, mime, &bytes), preview))
}

/// Textures backing the attachment chips, keyed by the store's preview handle.
#[derive(Default)]
pub struct PreviewTextures {
    textures: HashMap<PreviewRef, egui::TextureHandle>,
}

impl PreviewTextures {
    pub fn insert(&mut self, ctx: &egui::Context, preview: PreviewRef, image: egui::ColorImage) {
        let texture = ctx.load_texture(
            format!("attachment-{}", preview.0),
            image,
            egui::TextureOptions::LINEAR,
        );
        self.textures.insert(preview, texture);
    }

    pub fn get(&self, preview: Option<PreviewRef>) -> Option<&egui::TextureHandle> {
        self.textures.get(&preview?)
    }

    /// Dropping the handle frees the texture.
    pub fn release(&mut self, preview: PreviewRef) {
        if self.textures.remove(&preview).is_some() {
            tracing::debug!(preview = preview.0, "preview texture released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn test_sniff_mime_uses_magic_bytes() {
        assert_eq!(sniff_mime(PNG_MAGIC), Some("image/png"));
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0]), Some("image/jpeg"));
        assert_eq!(sniff_mime(b"GIF89a......"), Some("image/gif"));
        assert_eq!(sniff_mime(b"plain text, not an image"), None);
    }

    #[test]
    fn test_load_image_rejects_non_images() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("notes.png");
        fs::write(&path, "hello").unwrap();
        let err = load_image(&path).unwrap_err();
        assert!(err.to_string().contains("not a supported image"));
    }

    #[test]
    fn test_load_image_encodes_and_thumbnails() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("red.png");
        image::RgbaImage::from_pixel(300, 150, image::Rgba([255, 0, 0, 255]))
            .save(&path)
            .unwrap();

        let (attachment, preview) = load_image(&path).unwrap();
        assert_eq!(attachment.name, "red.png");
        assert_eq!(attachment.mime_type, "image/png");
        assert!(attachment.is_sendable());
        assert_eq!(preview.size, [96, 48]);
    }
}
