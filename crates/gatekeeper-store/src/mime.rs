//! Magic-byte MIME sniffing for stored content (spec §4.6).

pub fn sniff(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        return "image/png".to_string();
    }
    if bytes.starts_with(&[0xFF, 0xD8]) {
        return "image/jpeg".to_string();
    }
    if bytes.starts_with(b"GIF8") {
        return "image/gif".to_string();
    }
    if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        return "image/webp".to_string();
    }
    if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WAVE" {
        return "audio/wav".to_string();
    }
    if bytes.starts_with(b"%PDF") {
        return "application/pdf".to_string();
    }
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        return "video/mp4".to_string();
    }
    if bytes.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        return "video/webm".to_string();
    }
    if bytes.starts_with(b"ID3") || (bytes.len() >= 2 && bytes[0] == 0xFF && (bytes[1] & 0xE0) == 0xE0) {
        return "audio/mpeg".to_string();
    }
    if is_probably_text(bytes) {
        return "text/plain".to_string();
    }
    "application/octet-stream".to_string()
}

fn is_probably_text(bytes: &[u8]) -> bool {
    if bytes.is_empty() {
        return true;
    }
    let sample = &bytes[..bytes.len().min(512)];
    std::str::from_utf8(sample).is_ok()
}

pub fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/png" => ".png",
        "image/jpeg" => ".jpg",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "application/pdf" => ".pdf",
        "video/mp4" => ".mp4",
        "video/webm" => ".webm",
        "audio/mpeg" => ".mp3",
        "audio/wav" => ".wav",
        "text/plain" => ".txt",
        _ => ".bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_png_magic_bytes() {
        let mut bytes = vec![0x89, 0x50, 0x4E, 0x47];
        bytes.extend_from_slice(b"rest of file");
        assert_eq!(sniff(&bytes), "image/png");
        assert_eq!(extension_for(&sniff(&bytes)), ".png");
    }

    #[test]
    fn sniffs_jpeg_and_gif_and_pdf() {
        assert_eq!(sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(sniff(b"GIF89a..."), "image/gif");
        assert_eq!(sniff(b"%PDF-1.4"), "application/pdf");
    }

    #[test]
    fn unknown_binary_falls_back_to_octet_stream() {
        let bytes = [0x00, 0x01, 0x02, 0xFF, 0xFE, 0x80, 0x81];
        assert_eq!(sniff(&bytes), "application/octet-stream");
    }

    #[test]
    fn plain_utf8_text_is_text_plain() {
        assert_eq!(sniff(b"hello world"), "text/plain");
    }
}
