use odk_model::Attachment;

/// Maps a stored media file name to a download URI.
pub trait AttachmentResolver {
    /// `None` when no attachment of the submission matches `filename`.
    fn resolve(&self, filename: &str, attachments: &[Attachment]) -> Option<String>;
}

/// Matches attachments by file name suffix and prefixes their download URL
/// with a host.
#[derive(Debug, Clone, Default)]
pub struct HostAttachmentResolver {
    host: Option<String>,
}

impl HostAttachmentResolver {
    pub fn new(host: Option<String>) -> Self {
        Self {
            host: host.map(|host| host.trim_end_matches('/').to_string()),
        }
    }
}

impl AttachmentResolver for HostAttachmentResolver {
    fn resolve(&self, filename: &str, attachments: &[Attachment]) -> Option<String> {
        if filename.is_empty() {
            return None;
        }
        let attachment = attachments
            .iter()
            .find(|attachment| attachment.filename.ends_with(filename))?;
        let url = attachment
            .download_url
            .clone()
            .unwrap_or_else(|| format!("/media/{}", attachment.filename));
        Some(match &self.host {
            Some(host) if url.starts_with('/') => format!("{host}{url}"),
            _ => url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachments() -> Vec<Attachment> {
        vec![Attachment {
            filename: "bob/attachments/1442_tutorial/1-16_12_30.jpg".to_string(),
            download_url: Some("/api/v1/files/1?filename=1-16_12_30.jpg".to_string()),
            mimetype: Some("image/jpeg".to_string()),
        }]
    }

    #[test]
    fn resolves_by_suffix_with_host() {
        let resolver = HostAttachmentResolver::new(Some("https://example.org/".to_string()));
        assert_eq!(
            resolver.resolve("1-16_12_30.jpg", &attachments()).as_deref(),
            Some("https://example.org/api/v1/files/1?filename=1-16_12_30.jpg")
        );
        assert_eq!(resolver.resolve("other.jpg", &attachments()), None);
    }

    #[test]
    fn missing_download_url_falls_back_to_media_path() {
        let mut list = attachments();
        list[0].download_url = None;
        let resolver = HostAttachmentResolver::default();
        assert_eq!(
            resolver.resolve("1-16_12_30.jpg", &list).as_deref(),
            Some("/media/bob/attachments/1442_tutorial/1-16_12_30.jpg")
        );
    }
}
