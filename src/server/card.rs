//! Open Graph preview cards, rasterised to PNG.
//!
//! Cards are drawn without text: a verdict-coloured header band with a badge,
//! and the shared photo in a framed panel. Shares that are gone, or whose
//! photo can't be decoded, get the generic card instead.

use base64::Engine as _;
use image::{imageops, imageops::FilterType, DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use thiserror::Error;
use tracing::debug;

use crate::share::ShareRecord;

/// Width of the preview card in pixels.
pub const CARD_WIDTH: u32 = 1200;
/// Height of the preview card in pixels.
pub const CARD_HEIGHT: u32 = 630;

const BAND_HEIGHT: u32 = 120;
const FRAME_LEFT: u32 = 120;
const FRAME_TOP: u32 = 150;
const FRAME_RIGHT: u32 = 1080;
const FRAME_BOTTOM: u32 = 600;
const FRAME_BORDER: u32 = 8;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const MUSTARD: Rgba<u8> = Rgba([251, 191, 36, 255]);
const SAUSAGE: Rgba<u8> = Rgba([180, 83, 9, 255]);

/// Preview card errors
#[derive(Error, Debug)]
pub enum CardError {
    #[error("Image payload is not a base64 data URL")]
    NotDataUrl,

    #[error("Failed to decode base64 image payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Failed to process image: {0}")]
    Image(#[from] image::ImageError),
}

/// What a preview card shows.
#[derive(Debug, Clone, PartialEq)]
pub struct CardView {
    /// False renders the generic fallback card.
    pub found: bool,
    pub is_hot_dog: bool,
    pub image_data: Option<String>,
}

impl CardView {
    /// Card for a live share. Falls back when the payload isn't an embeddable image.
    pub fn from_record(record: &ShareRecord) -> Self {
        if !is_embeddable_image(&record.image_data) {
            return Self::fallback();
        }
        Self {
            found: true,
            is_hot_dog: record.is_hot_dog,
            image_data: Some(record.image_data.clone()),
        }
    }

    /// Generic card for absent or expired shares.
    pub fn fallback() -> Self {
        Self {
            found: false,
            is_hot_dog: false,
            image_data: None,
        }
    }

    /// Background and accent colours.
    fn palette(&self) -> (Rgba<u8>, Rgba<u8>) {
        match (self.found, self.is_hot_dog) {
            (false, _) => (Rgba([255, 237, 213, 255]), Rgba([217, 119, 6, 255])),
            (true, true) => (Rgba([236, 253, 245, 255]), Rgba([5, 150, 105, 255])),
            (true, false) => (Rgba([254, 242, 242, 255]), Rgba([220, 38, 38, 255])),
        }
    }
}

/// Whether a payload is a base64 `data:image/...` URL.
pub fn is_embeddable_image(image_data: &str) -> bool {
    image_data.starts_with("data:image/") && image_data.contains(";base64,")
}

/// Decode the image inside a base64 data URL.
pub fn decode_data_url(data_url: &str) -> Result<DynamicImage, CardError> {
    let (_, payload) = data_url
        .split_once(";base64,")
        .ok_or(CardError::NotDataUrl)?;
    let bytes = base64::engine::general_purpose::STANDARD.decode(payload.trim())?;
    Ok(image::load_from_memory(&bytes)?)
}

/// Render a card as PNG bytes.
pub fn render_card(card: &CardView) -> Result<Vec<u8>, CardError> {
    let photo = match card.image_data.as_deref().map(decode_data_url) {
        Some(Ok(photo)) => Some(photo),
        Some(Err(e)) => {
            debug!(error = %e, "Share image unreadable, rendering generic card");
            return render_card(&CardView::fallback());
        }
        None => None,
    };

    let (background, accent) = card.palette();
    let mut canvas = RgbaImage::from_pixel(CARD_WIDTH, CARD_HEIGHT, background);

    fill_rect(&mut canvas, 0, 0, CARD_WIDTH, BAND_HEIGHT, accent);
    draw_badge(&mut canvas, card);

    fill_rect(&mut canvas, FRAME_LEFT, FRAME_TOP, FRAME_RIGHT, FRAME_BOTTOM, MUSTARD);
    let (inner_left, inner_top) = (FRAME_LEFT + FRAME_BORDER, FRAME_TOP + FRAME_BORDER);
    let (inner_right, inner_bottom) = (FRAME_RIGHT - FRAME_BORDER, FRAME_BOTTOM - FRAME_BORDER);
    fill_rect(&mut canvas, inner_left, inner_top, inner_right, inner_bottom, WHITE);

    let (inner_width, inner_height) = (inner_right - inner_left, inner_bottom - inner_top);
    match photo {
        Some(photo) => {
            let fitted = photo
                .resize(inner_width, inner_height, FilterType::Triangle)
                .to_rgba8();
            let x = inner_left + (inner_width - fitted.width()) / 2;
            let y = inner_top + (inner_height - fitted.height()) / 2;
            imageops::overlay(&mut canvas, &fitted, i64::from(x), i64::from(y));
        }
        None => {
            let cx = i64::from(CARD_WIDTH / 2);
            let cy = i64::from(inner_top + inner_height / 2);
            draw_hot_dog(&mut canvas, cx, cy, 3);
        }
    }

    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(canvas).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Round badge in the header band: a hot dog, crossed out for a "not hot dog" share.
fn draw_badge(canvas: &mut RgbaImage, card: &CardView) {
    let (cx, cy, r) = (i64::from(CARD_WIDTH / 2), i64::from(BAND_HEIGHT / 2), 48);
    fill_where(canvas, cx - r, cy - r, cx + r, cy + r, WHITE, |x, y| {
        (x - cx).pow(2) + (y - cy).pow(2) <= r * r
    });
    draw_hot_dog(canvas, cx, cy, 1);

    if card.found && !card.is_hot_dog {
        let (_, accent) = card.palette();
        let arm = 30;
        fill_segment(canvas, (cx - arm, cy - arm), (cx + arm, cy + arm), 5, accent);
        fill_segment(canvas, (cx - arm, cy + arm), (cx + arm, cy - arm), 5, accent);
    }
}

/// Bun and sausage, centred on `(cx, cy)`.
fn draw_hot_dog(canvas: &mut RgbaImage, cx: i64, cy: i64, scale: i64) {
    let (bun_half, bun_radius) = (24 * scale, 12 * scale);
    fill_segment(canvas, (cx - bun_half, cy), (cx + bun_half, cy), bun_radius, MUSTARD);

    let (sausage_half, sausage_radius) = (34 * scale, 6 * scale);
    fill_segment(
        canvas,
        (cx - sausage_half, cy),
        (cx + sausage_half, cy),
        sausage_radius,
        SAUSAGE,
    );
}

fn fill_rect(
    canvas: &mut RgbaImage,
    left: u32,
    top: u32,
    right: u32,
    bottom: u32,
    color: Rgba<u8>,
) {
    for y in top..bottom.min(canvas.height()) {
        for x in left..right.min(canvas.width()) {
            canvas.put_pixel(x, y, color);
        }
    }
}

/// Fill every pixel within `radius` of the segment from `a` to `b`.
fn fill_segment(
    canvas: &mut RgbaImage,
    a: (i64, i64),
    b: (i64, i64),
    radius: i64,
    color: Rgba<u8>,
) {
    let (dx, dy) = ((b.0 - a.0) as f64, (b.1 - a.1) as f64);
    let length_sq = dx * dx + dy * dy;
    let radius_sq = (radius * radius) as f64;

    fill_where(
        canvas,
        a.0.min(b.0) - radius,
        a.1.min(b.1) - radius,
        a.0.max(b.0) + radius,
        a.1.max(b.1) + radius,
        color,
        |x, y| {
            let (px, py) = ((x - a.0) as f64, (y - a.1) as f64);
            let t = if length_sq == 0.0 {
                0.0
            } else {
                ((px * dx + py * dy) / length_sq).clamp(0.0, 1.0)
            };
            let (ex, ey) = (px - t * dx, py - t * dy);
            ex * ex + ey * ey <= radius_sq
        },
    );
}

/// Paint pixels in the inclusive box that satisfy `inside`, clipped to the canvas.
fn fill_where(
    canvas: &mut RgbaImage,
    left: i64,
    top: i64,
    right: i64,
    bottom: i64,
    color: Rgba<u8>,
    inside: impl Fn(i64, i64) -> bool,
) {
    let (width, height) = (i64::from(canvas.width()), i64::from(canvas.height()));
    for y in top.max(0)..=bottom.min(height - 1) {
        for x in left.max(0)..=right.min(width - 1) {
            if inside(x, y) {
                canvas.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::share::ShareId;
    use chrono::Utc;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn record(image_data: &str, is_hot_dog: bool) -> ShareRecord {
        ShareRecord {
            id: ShareId::from("0123456789abcdef0123456789abcdef"),
            image_data: image_data.to_string(),
            is_hot_dog,
            created_at: Utc::now(),
        }
    }

    fn red_square_data_url() -> String {
        let square = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        let mut png = Vec::new();
        DynamicImage::ImageRgba8(square)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(png)
        )
    }

    fn decode(png: &[u8]) -> RgbaImage {
        assert!(png.starts_with(&PNG_SIGNATURE));
        image::load_from_memory_with_format(png, ImageFormat::Png)
            .unwrap()
            .to_rgba8()
    }

    #[test]
    fn test_render_card_with_photo() {
        let card = CardView::from_record(&record(&red_square_data_url(), true));
        assert!(card.found);

        let canvas = decode(&render_card(&card).unwrap());

        assert_eq!(canvas.dimensions(), (CARD_WIDTH, CARD_HEIGHT));
        let centre = canvas.get_pixel(600, 375);
        assert!(centre[0] > 250 && centre[1] < 5 && centre[2] < 5, "{:?}", centre);
        assert_eq!(*canvas.get_pixel(10, 10), Rgba([5, 150, 105, 255]));
        assert_eq!(*canvas.get_pixel(10, 620), Rgba([236, 253, 245, 255]));
    }

    #[test]
    fn test_not_hot_dog_uses_red_band() {
        let card = CardView::from_record(&record(&red_square_data_url(), false));
        let canvas = decode(&render_card(&card).unwrap());
        assert_eq!(*canvas.get_pixel(10, 10), Rgba([220, 38, 38, 255]));
    }

    #[test]
    fn test_render_fallback_card() {
        let canvas = decode(&render_card(&CardView::fallback()).unwrap());

        assert_eq!(canvas.dimensions(), (CARD_WIDTH, CARD_HEIGHT));
        assert_eq!(*canvas.get_pixel(10, 10), Rgba([217, 119, 6, 255]));
        assert_eq!(*canvas.get_pixel(10, 620), Rgba([255, 237, 213, 255]));
    }

    #[test]
    fn test_undecodable_photo_renders_fallback() {
        let card = CardView::from_record(&record("data:image/jpeg;base64,QUJD", true));
        assert!(card.found);

        let png = render_card(&card).unwrap();
        assert_eq!(png, render_card(&CardView::fallback()).unwrap());
    }

    #[test]
    fn test_non_image_payload_is_fallback() {
        let card = CardView::from_record(&record("not a data url", true));
        assert_eq!(card, CardView::fallback());
    }

    #[test]
    fn test_decode_data_url_errors() {
        assert!(matches!(
            decode_data_url("data:image/png,raw"),
            Err(CardError::NotDataUrl)
        ));
        assert!(matches!(
            decode_data_url("data:image/png;base64,***"),
            Err(CardError::Base64(_))
        ));
        assert!(matches!(
            decode_data_url("data:image/png;base64,QUJD"),
            Err(CardError::Image(_))
        ));
    }

    #[test]
    fn test_is_embeddable_image() {
        assert!(is_embeddable_image("data:image/png;base64,AAA"));
        assert!(!is_embeddable_image("data:text/html;base64,AAA"));
        assert!(!is_embeddable_image("https://example.com/dog.png"));
    }
}
