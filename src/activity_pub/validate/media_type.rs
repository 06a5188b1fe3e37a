use std::fmt::Display;

/// Accepted MIME types and the file extension each is usually stored under.
#[rustfmt::skip]
static MEDIA_TYPES: &[(&str, &str)] = &[
    ("application/activity+json", "json"),
    ("application/atom+xml", "atom"),
    ("application/epub+zip", "epub"),
    ("application/gzip", "gz"),
    ("application/javascript", "js"),
    ("application/json", "json"),
    ("application/ld+json", "jsonld"),
    ("application/msword", "doc"),
    ("application/octet-stream", "bin"),
    ("application/ogg", "ogx"),
    ("application/pdf", "pdf"),
    ("application/rss+xml", "rss"),
    ("application/rtf", "rtf"),
    ("application/vnd.ms-excel", "xls"),
    ("application/vnd.ms-powerpoint", "ppt"),
    ("application/vnd.oasis.opendocument.presentation", "odp"),
    ("application/vnd.oasis.opendocument.spreadsheet", "ods"),
    ("application/vnd.oasis.opendocument.text", "odt"),
    ("application/vnd.openxmlformats-officedocument.presentationml.presentation", "pptx"),
    ("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet", "xlsx"),
    ("application/vnd.openxmlformats-officedocument.wordprocessingml.document", "docx"),
    ("application/wasm", "wasm"),
    ("application/x-7z-compressed", "7z"),
    ("application/x-bittorrent", "torrent"),
    ("application/x-mpegurl", "m3u8"),
    ("application/x-tar", "tar"),
    ("application/xhtml+xml", "xhtml"),
    ("application/xml", "xml"),
    ("application/zip", "zip"),
    ("audio/3gpp", "3gp"),
    ("audio/aac", "aac"),
    ("audio/flac", "flac"),
    ("audio/midi", "mid"),
    ("audio/mp4", "m4a"),
    ("audio/mpeg", "mp3"),
    ("audio/ogg", "oga"),
    ("audio/opus", "opus"),
    ("audio/vnd.wave", "wav"),
    ("audio/wav", "wav"),
    ("audio/wave", "wav"),
    ("audio/webm", "weba"),
    ("audio/x-m4a", "m4a"),
    ("audio/x-wav", "wav"),
    ("font/otf", "otf"),
    ("font/ttf", "ttf"),
    ("font/woff", "woff"),
    ("font/woff2", "woff2"),
    ("image/apng", "apng"),
    ("image/avif", "avif"),
    ("image/bmp", "bmp"),
    ("image/gif", "gif"),
    ("image/heic", "heic"),
    ("image/heif", "heif"),
    ("image/jpeg", "jpg"),
    ("image/jxl", "jxl"),
    ("image/png", "png"),
    ("image/svg+xml", "svg"),
    ("image/tiff", "tiff"),
    ("image/vnd.microsoft.icon", "ico"),
    ("image/webp", "webp"),
    ("image/x-icon", "ico"),
    ("model/gltf+json", "gltf"),
    ("model/gltf-binary", "glb"),
    ("text/calendar", "ics"),
    ("text/css", "css"),
    ("text/csv", "csv"),
    ("text/html", "html"),
    ("text/javascript", "js"),
    ("text/markdown", "md"),
    ("text/plain", "txt"),
    ("text/vtt", "vtt"),
    ("text/x-markdown", "md"),
    ("text/xml", "xml"),
    ("video/3gpp", "3gp"),
    ("video/mp2t", "ts"),
    ("video/mp4", "mp4"),
    ("video/mpeg", "mpeg"),
    ("video/ogg", "ogv"),
    ("video/quicktime", "mov"),
    ("video/webm", "webm"),
    ("video/x-matroska", "mkv"),
    ("video/x-msvideo", "avi"),
];

/// A `mediaType` value known to the MIME table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    text: String,
    extension: &'static str,
}

impl MediaType {
    /// Parameters such as `; profile=...` are ignored for the lookup but kept
    /// in the stored text.
    pub fn parse(text: &str) -> Result<MediaType, String> {
        let essence = text
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let Some(&(_, extension)) = MEDIA_TYPES.iter().find(|(mime, _)| *mime == essence) else {
            return Err(format!("{text:?} is not a known media type"));
        };
        Ok(MediaType {
            text: text.to_string(),
            extension,
        })
    }
    pub fn as_str(&self) -> &str {
        &self.text
    }
    /// File extension for the type, without the dot.
    pub fn extension(&self) -> &'static str {
        self.extension
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::{MEDIA_TYPES, MediaType};

    #[test]
    fn known_types() {
        let jpeg = MediaType::parse("image/jpeg").unwrap();
        assert_eq!(jpeg.extension(), "jpg");

        let ld = MediaType::parse(
            r#"application/ld+json; profile="https://www.w3.org/ns/activitystreams""#,
        )
        .unwrap();
        assert_eq!(ld.extension(), "jsonld");
        assert!(ld.as_str().contains("profile"));

        assert_eq!(MediaType::parse("Text/HTML").unwrap().extension(), "html");
    }

    #[test]
    fn unknown_types() {
        for text in ["image/jpg2", "text", "", "; charset=utf-8", "video/mp4x"] {
            assert!(MediaType::parse(text).is_err(), "{text}");
        }
    }

    #[test]
    fn table_is_lowercase_and_unique() {
        for (i, (mime, _)) in MEDIA_TYPES.iter().enumerate() {
            assert_eq!(*mime, mime.to_ascii_lowercase());
            assert!(!MEDIA_TYPES[i + 1..].iter().any(|(other, _)| other == mime));
        }
    }
}
