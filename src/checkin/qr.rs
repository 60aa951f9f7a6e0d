use crate::checkin::event::event_id;
use crate::checkin::token::{TokenPayload, TokenSigner};
use crate::checkin::CheckinSettings;
use crate::utils::error::Result;
use crate::utils::validation::validate_url;
use chrono::{DateTime, Duration, Utc};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use qrcode::{Color, EcLevel, QrCode};
use std::path::PathBuf;

const MODULE_PX: u32 = 10;
const QUIET_ZONE: u32 = 4;
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

#[derive(Debug, Clone)]
pub struct CheckinArtifact {
    pub event_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub url: String,
    pub path: PathBuf,
}

pub fn checkin_url(base_url: &str, event_id: &str, token: &str) -> Result<String> {
    validate_url("checkin.base_url", base_url)?;
    Ok(format!(
        "{}/?event={}&sig={}",
        base_url.trim_end_matches('/'),
        event_id,
        token
    ))
}

/// 像素中心是否落在圓角矩形內
fn inside_rounded_rect(x: u32, y: u32, width: u32, height: u32, radius: u32) -> bool {
    let r = radius.min(width / 2).min(height / 2) as f32;
    let px = x as f32 + 0.5;
    let py = y as f32 + 0.5;
    let dx = px - px.clamp(r, width as f32 - r);
    let dy = py - py.clamp(r, height as f32 - r);
    dx * dx + dy * dy <= r * r
}

fn round_corners(img: &mut RgbaImage, radius: u32) {
    let (width, height) = img.dimensions();
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        if !inside_rounded_rect(x, y, width, height, radius) {
            *pixel = CLEAR;
        }
    }
}

fn rounded_plate(width: u32, height: u32, radius: u32, color: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        if inside_rounded_rect(x, y, width, height, radius) {
            color
        } else {
            CLEAR
        }
    })
}

/// 以 H 級錯誤修正產生 QR code，再縮放到指定尺寸
pub fn render_qr(data: &str, size: u32) -> Result<RgbaImage> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::H)?;
    let modules = code.width() as u32;
    let side = (modules + 2 * QUIET_ZONE) * MODULE_PX;

    let mut img = RgbaImage::from_pixel(side, side, WHITE);
    for (idx, color) in code.to_colors().into_iter().enumerate() {
        if color != Color::Dark {
            continue;
        }
        let left = (idx as u32 % modules + QUIET_ZONE) * MODULE_PX;
        let top = (idx as u32 / modules + QUIET_ZONE) * MODULE_PX;
        for y in top..top + MODULE_PX {
            for x in left..left + MODULE_PX {
                img.put_pixel(x, y, BLACK);
            }
        }
    }

    Ok(imageops::resize(&img, size, size, FilterType::Lanczos3))
}

/// 把 logo 放在 QR code 正中央，底下墊一塊白色圓角底板
pub fn overlay_logo(qr: &mut RgbaImage, logo: DynamicImage, settings: &CheckinSettings) {
    let max_side = (settings.qr_size as f32 * settings.logo_scale) as u32;
    let logo = if logo.width() > max_side || logo.height() > max_side {
        logo.resize(max_side, max_side, FilterType::Lanczos3)
    } else {
        logo
    };
    let mut logo = logo.to_rgba8();

    let border_px = ((logo.width() as f32 * settings.border_frac) as u32).max(2);
    let plate = rounded_plate(
        logo.width() + 2 * border_px,
        logo.height() + 2 * border_px,
        settings.corner_radius,
        WHITE,
    );
    round_corners(&mut logo, settings.corner_radius);

    let bx = qr.width().saturating_sub(plate.width()) / 2;
    let by = qr.height().saturating_sub(plate.height()) / 2;
    imageops::overlay(qr, &plate, i64::from(bx), i64::from(by));
    imageops::overlay(
        qr,
        &logo,
        i64::from(bx + border_px),
        i64::from(by + border_px),
    );
}

pub fn generate_checkin_qr(settings: &CheckinSettings, now: DateTime<Utc>) -> Result<CheckinArtifact> {
    validate_url("checkin.base_url", &settings.base_url)?;

    let event_id = event_id(now, settings.tz()?);
    let payload = TokenPayload::new(&event_id, now, Duration::hours(settings.valid_for_hours));
    let token = TokenSigner::new(&settings.secret_key, &settings.sign_salt)?.sign_at(&payload, now)?;
    let url = checkin_url(&settings.base_url, &event_id, &token)?;

    let mut img = render_qr(&url, settings.qr_size)?;

    if settings.logo_path.exists() {
        let logo = image::open(&settings.logo_path)?;
        overlay_logo(&mut img, logo, settings);
    } else {
        tracing::debug!(
            "Logo {} not found, generating plain QR code",
            settings.logo_path.display()
        );
    }

    std::fs::create_dir_all(&settings.output_dir)?;
    let path = settings.output_dir.join(format!("QR_{}.png", event_id));
    img.save(&path)?;

    tracing::info!("🎟️  Check-in QR for event {} saved to {}", event_id, path.display());

    Ok(CheckinArtifact {
        event_id,
        issued_at: payload.issued_at,
        expires_at: payload.expires_at,
        url,
        path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::OpsError;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn settings_in(dir: &TempDir) -> CheckinSettings {
        CheckinSettings {
            base_url: "https://odyssey.example.org/checkin/".to_string(),
            secret_key: "troupe-secret".to_string(),
            logo_path: dir.path().join("missing_logo.png"),
            output_dir: dir.path().join("qr"),
            ..CheckinSettings::default()
        }
    }

    fn practice_night() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 17, 0, 30, 0).unwrap()
    }

    #[test]
    fn test_rounded_rect_cuts_corners() {
        assert!(!inside_rounded_rect(0, 0, 100, 100, 18));
        assert!(!inside_rounded_rect(99, 99, 100, 100, 18));
        assert!(inside_rounded_rect(50, 0, 100, 100, 18));
        assert!(inside_rounded_rect(0, 50, 100, 100, 18));
        assert!(inside_rounded_rect(18, 18, 100, 100, 18));
        // 半徑為 0 時就是一般矩形
        assert!(inside_rounded_rect(0, 0, 10, 10, 0));
    }

    #[test]
    fn test_checkin_url_format() {
        let url = checkin_url("https://odyssey.example.org/", "20251216-1930", "abc.def.ghi").unwrap();
        assert_eq!(
            url,
            "https://odyssey.example.org/?event=20251216-1930&sig=abc.def.ghi"
        );
        assert!(checkin_url("", "20251216-1930", "abc").is_err());
    }

    #[test]
    fn test_render_qr_has_quiet_zone() {
        let img = render_qr("https://odyssey.example.org/?event=1", 400).unwrap();
        assert_eq!(img.dimensions(), (400, 400));
        assert_eq!(*img.get_pixel(2, 2), WHITE);
    }

    #[test]
    fn test_generate_without_logo() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(&dir);

        let artifact = generate_checkin_qr(&settings, practice_night()).unwrap();

        assert_eq!(artifact.event_id, "20251216-1930");
        assert_eq!(artifact.expires_at, practice_night() + Duration::hours(48));
        assert!(artifact
            .url
            .starts_with("https://odyssey.example.org/checkin/?event=20251216-1930&sig="));
        assert_eq!(artifact.path, dir.path().join("qr").join("QR_20251216-1930.png"));

        let saved = image::open(&artifact.path).unwrap();
        assert_eq!((saved.width(), saved.height()), (800, 800));
    }

    #[test]
    fn test_generated_token_verifies() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(&dir);
        let artifact = generate_checkin_qr(&settings, practice_night()).unwrap();

        let token = artifact.url.split("&sig=").nth(1).unwrap();
        let signer = TokenSigner::new(&settings.secret_key, &settings.sign_salt).unwrap();
        let payload = signer
            .verify_at(token, Duration::hours(48), practice_night() + Duration::hours(1))
            .unwrap();
        assert_eq!(payload.event_id, artifact.event_id);
    }

    #[test]
    fn test_generate_with_logo_centres_it() {
        let dir = TempDir::new().unwrap();
        let mut settings = settings_in(&dir);
        settings.logo_path = dir.path().join("logo.png");
        RgbaImage::from_pixel(400, 400, Rgba([200, 16, 46, 255]))
            .save(&settings.logo_path)
            .unwrap();

        let artifact = generate_checkin_qr(&settings, practice_night()).unwrap();
        let saved = image::open(&artifact.path).unwrap().to_rgba8();

        assert_eq!(*saved.get_pixel(400, 400), Rgba([200, 16, 46, 255]));
        // logo 縮到 200px，加上 6px 白邊
        assert_eq!(*saved.get_pixel(400, 400 - 100 - 3), WHITE);
    }

    #[test]
    fn test_generate_requires_base_url_and_secret() {
        let dir = TempDir::new().unwrap();

        let mut settings = settings_in(&dir);
        settings.base_url = String::new();
        assert!(matches!(
            generate_checkin_qr(&settings, practice_night()),
            Err(OpsError::InvalidConfigValueError { .. })
        ));

        let mut settings = settings_in(&dir);
        settings.secret_key = crate::checkin::token::PLACEHOLDER_SECRET.to_string();
        assert!(matches!(
            generate_checkin_qr(&settings, practice_night()),
            Err(OpsError::MissingConfigError { .. })
        ));
    }
}
