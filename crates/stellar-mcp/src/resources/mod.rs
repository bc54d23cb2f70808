//! File-backed MCP resources
//!
//! Each document is listed only when its path is configured. Contents are
//! read from disk on every `resources/read`, so edits show up without a
//! restart.

use std::path::{Path, PathBuf};

use stellar_mcp_core::ResourcePaths;
use tracing::debug;

use crate::protocol::{Resource, ResourceContent, ResourcesReadResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// No registered resource has this URI
    Unknown,
    /// Registered, but the backing file could not be read
    Unreadable(String),
}

struct FileResource {
    name: &'static str,
    description: &'static str,
    mime_type: &'static str,
    path: PathBuf,
}

impl FileResource {
    fn uri(&self) -> String {
        file_uri(&self.path)
    }

    fn to_resource(&self) -> Resource {
        Resource {
            uri: self.uri(),
            name: self.name.to_string(),
            description: Some(self.description.to_string()),
            mime_type: Some(self.mime_type.to_string()),
        }
    }
}

/// `file:///` URI for a configured path
pub fn file_uri(path: &Path) -> String {
    let display = path.to_string_lossy();
    format!("file:///{}", display.trim_start_matches('/'))
}

fn registered(paths: &ResourcePaths) -> Vec<FileResource> {
    let mut resources = Vec::new();
    if let Some(path) = &paths.agent_keypair {
        resources.push(FileResource {
            name: "Agent Keys",
            description: "Stellar keypair for the AI Agent",
            mime_type: "text/plain",
            path: path.clone(),
        });
    }
    if let Some(path) = &paths.usage_guide {
        resources.push(FileResource {
            name: "MCP Usage Guide",
            description: "How and when to use Stellar tools and the provided keys",
            mime_type: "text/markdown",
            path: path.clone(),
        });
    }
    if let Some(path) = &paths.sac_guide {
        resources.push(FileResource {
            name: "Stellar Tokens SAC Guide",
            description:
                "Guide for interacting with Stellar Asset Contracts (SAC) through the MCP server",
            mime_type: "text/markdown",
            path: path.clone(),
        });
    }
    resources
}

pub fn get_all_resources(paths: &ResourcePaths) -> Vec<Resource> {
    registered(paths).iter().map(FileResource::to_resource).collect()
}

/// Read a resource by URI
pub async fn read_resource(
    paths: &ResourcePaths,
    uri: &str,
) -> Result<ResourcesReadResult, ResourceError> {
    let resource = registered(paths)
        .into_iter()
        .find(|r| r.uri() == uri)
        .ok_or(ResourceError::Unknown)?;

    debug!(uri, path = %resource.path.display(), "Reading resource file");
    let text = tokio::fs::read_to_string(&resource.path)
        .await
        .map_err(|e| {
            ResourceError::Unreadable(format!("Failed to read {}: {}", resource.path.display(), e))
        })?;

    Ok(ResourcesReadResult {
        contents: vec![ResourceContent {
            uri: uri.to_string(),
            mime_type: Some(resource.mime_type.to_string()),
            text: Some(text),
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_nothing_configured() {
        assert!(get_all_resources(&ResourcePaths::default()).is_empty());
    }

    #[test]
    fn test_only_configured_resources_are_listed() {
        let paths = ResourcePaths {
            usage_guide: Some(PathBuf::from("/srv/guide.md")),
            ..ResourcePaths::default()
        };
        let resources = get_all_resources(&paths);
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].name, "MCP Usage Guide");
        assert_eq!(resources[0].uri, "file:///srv/guide.md");
        assert_eq!(resources[0].mime_type.as_deref(), Some("text/markdown"));
    }

    #[test]
    fn test_relative_paths() {
        assert_eq!(file_uri(Path::new("keys.txt")), "file:///keys.txt");
    }

    #[tokio::test]
    async fn test_read_keypair_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "GABC / SABC").unwrap();
        let paths = ResourcePaths {
            agent_keypair: Some(file.path().to_path_buf()),
            ..ResourcePaths::default()
        };

        let uri = file_uri(file.path());
        let result = read_resource(&paths, &uri).await.unwrap();
        assert_eq!(result.contents[0].text.as_deref(), Some("GABC / SABC\n"));
        assert_eq!(result.contents[0].mime_type.as_deref(), Some("text/plain"));
    }

    #[tokio::test]
    async fn test_unknown_uri() {
        let err = read_resource(&ResourcePaths::default(), "file:///etc/passwd")
            .await
            .unwrap_err();
        assert_eq!(err, ResourceError::Unknown);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.md");
        let paths = ResourcePaths {
            sac_guide: Some(path.clone()),
            ..ResourcePaths::default()
        };
        let err = read_resource(&paths, &file_uri(&path)).await.unwrap_err();
        assert!(matches!(err, ResourceError::Unreadable(_)));
    }
}
