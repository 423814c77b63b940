//! Blob location parsing

use url::Url;

use crate::domain::DomainError;

/// Where an input image lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobLocation {
    /// Public object fetched with a plain HTTP GET, URL used as-is
    Http(String),
    /// Object addressed as `gs://bucket/object`
    Gcs { bucket: String, object: String },
}

impl BlobLocation {
    pub fn parse(blob_url: &str) -> Result<Self, DomainError> {
        let parsed = Url::parse(blob_url)
            .map_err(|_| DomainError::validation(format!("Unsupported URL scheme: {}", blob_url)))?;

        match parsed.scheme() {
            "http" | "https" => Ok(Self::Http(blob_url.to_string())),
            "gs" => {
                let bucket = parsed
                    .host_str()
                    .filter(|host| !host.is_empty())
                    .ok_or_else(|| {
                        DomainError::validation(format!("Missing bucket in URL: {}", blob_url))
                    })?
                    .to_string();

                // query and fragment are not part of the object name
                let object = parsed.path().trim_start_matches('/');

                let object = urlencoding::decode(object)
                    .map_err(|e| DomainError::validation(format!("Invalid object name: {}", e)))?
                    .into_owned();

                if object.is_empty() {
                    return Err(DomainError::validation(format!(
                        "Missing object name in URL: {}",
                        blob_url
                    )));
                }

                Ok(Self::Gcs { bucket, object })
            }
            _ => Err(DomainError::validation(format!(
                "Unsupported URL scheme: {}",
                blob_url
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_https_url_kept_as_is() {
        let url = "https://storage.googleapis.com/bucket/photos/a%20b.jpg?x=1";
        assert_eq!(
            BlobLocation::parse(url).unwrap(),
            BlobLocation::Http(url.to_string())
        );
    }

    #[test]
    fn test_parse_http_url() {
        let url = "http://example.com/a.png";
        assert_eq!(
            BlobLocation::parse(url).unwrap(),
            BlobLocation::Http(url.to_string())
        );
    }

    #[test]
    fn test_parse_gs_url() {
        let location = BlobLocation::parse("gs://my-bucket/path/to/blob.jpg").unwrap();
        assert_eq!(
            location,
            BlobLocation::Gcs {
                bucket: "my-bucket".to_string(),
                object: "path/to/blob.jpg".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_gs_url_drops_query() {
        let location = BlobLocation::parse("gs://b/a/b.jpg?generation=12").unwrap();
        assert_eq!(
            location,
            BlobLocation::Gcs {
                bucket: "b".to_string(),
                object: "a/b.jpg".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_gs_url_decodes_object_name() {
        let location = BlobLocation::parse("gs://b/with%20space.jpg").unwrap();
        assert_eq!(
            location,
            BlobLocation::Gcs {
                bucket: "b".to_string(),
                object: "with space.jpg".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_gs_url_without_object_fails() {
        assert!(BlobLocation::parse("gs://bucket/").is_err());
    }

    #[test]
    fn test_parse_unsupported_scheme() {
        let err = BlobLocation::parse("ftp://example.com/a.jpg").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: Unsupported URL scheme: ftp://example.com/a.jpg"
        );
    }

    #[test]
    fn test_parse_garbage() {
        assert!(BlobLocation::parse("not a url").is_err());
    }
}
