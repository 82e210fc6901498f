use base64ct::{Base64, Encoding};
use lazy_static::lazy_static;
use regex::Regex;

const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

/// Base64 text of an uploaded image. The input buffer is only borrowed, so the
/// same bytes can go to the model afterwards.
pub fn image_to_base64(body: &[u8]) -> String {
    Base64::encode_string(body)
}

/// Lower-cased extension after the last dot, if any.
pub fn extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

pub fn allowed_file(filename: &str) -> bool {
    extension(filename).is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

pub fn mime_from_ext(ext: &str) -> &'static str {
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

pub fn mime_for_filename(filename: &str) -> &'static str {
    extension(filename)
        .map(|ext| mime_from_ext(&ext))
        .unwrap_or("image/jpeg")
}

pub fn data_uri(filename: &str, image_base64: &str) -> String {
    let mime = match mime_for_filename(filename) {
        "application/octet-stream" => "image/jpeg",
        m => m,
    };
    format!("data:{mime};base64,{image_base64}")
}

/// Reduces a client-supplied filename to a safe ASCII basename.
///
/// Path separators become spaces, anything outside `[A-Za-z0-9_.-]` is dropped,
/// runs of whitespace collapse to `_`, and leading/trailing `.`/`_` are
/// stripped. May return an empty string.
pub fn sanitize_filename(raw: &str) -> String {
    lazy_static! {
        static ref UNSAFE_RE: Regex = Regex::new(r"[^A-Za-z0-9_.-]").unwrap();
    }
    let ascii: String = raw.chars().filter(char::is_ascii).collect();
    let spaced = ascii.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    UNSAFE_RE
        .replace_all(&joined, "")
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

#[cfg(test)]
mod image_tests {
    use super::*;

    #[test]
    fn test_image_to_base64() {
        assert_eq!(image_to_base64(b"hello"), "aGVsbG8=");
        assert_eq!(image_to_base64(&[]), "");
    }

    #[test]
    fn test_allowed_file() {
        assert!(allowed_file("dinner.JPG"));
        assert!(allowed_file("a.b.webp"));
        assert!(allowed_file("x.jpeg"));
        assert!(!allowed_file("notes.txt"));
        assert!(!allowed_file("png"));
        assert!(!allowed_file("archive.png.zip"));
    }

    #[test]
    fn test_mime_from_ext() {
        assert_eq!(mime_from_ext("jpg"), "image/jpeg");
        assert_eq!(mime_from_ext("jpeg"), "image/jpeg");
        assert_eq!(mime_from_ext("png"), "image/png");
        assert_eq!(mime_from_ext("webp"), "image/webp");
        assert_eq!(mime_from_ext("whatever"), "application/octet-stream");
    }

    #[test]
    fn test_data_uri() {
        assert_eq!(data_uri("a.gif", "R0lG"), "data:image/gif;base64,R0lG");
        assert_eq!(data_uri("noext", "AAAA"), "data:image/jpeg;base64,AAAA");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("My Lunch.jpg"), "My_Lunch.jpg");
        assert_eq!(sanitize_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_filename("C:\\photos\\pho bo.png"), "C_photos_pho_bo.png");
        assert_eq!(sanitize_filename("crème brûlée.webp"), "crme_brle.webp");
        assert_eq!(sanitize_filename("..."), "");
    }
}
