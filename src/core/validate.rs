//! Configuration validation. Runs before any archive or network I/O.

use crate::config::{Credential, DeployConfig, PackageConfig};
use crate::error::Error;

/// Check both configuration sections for completeness and consistency.
///
/// Returns one error per problem found; an empty list means the
/// configuration is valid. Has no side effects.
pub fn validate(package: &PackageConfig, deploy: &DeployConfig) -> Vec<Error> {
    let mut issues = Vec::new();

    // Deployment always consumes an archive produced by the same run.
    if deploy.enabled && !package.enabled {
        issues.push(Error::Config(
            "deploy requires package: enable packaging or disable deployment".to_string(),
        ));
    }

    if package.enabled {
        if package.source_dir.is_empty() {
            issues.push(Error::Config("package.sourceDir must not be empty".to_string()));
        }
        if package.archive_name.is_empty() {
            issues.push(Error::Config("package.archiveName must not be empty".to_string()));
        }
    }

    if deploy.enabled {
        let required = [
            ("host", &deploy.host),
            ("username", &deploy.username),
            ("remoteArchivePath", &deploy.remote_archive_path),
            ("remoteExtractDir", &deploy.remote_extract_dir),
        ];
        for (field, value) in required {
            if value.is_empty() {
                issues.push(Error::Config(format!("deploy.{} must not be empty", field)));
            }
        }

        if deploy.port == 0 {
            issues.push(Error::Config("deploy.port must be a valid TCP port".to_string()));
        }

        if let Err(err) =
            Credential::from_parts(deploy.password.as_deref(), deploy.private_key.as_deref())
        {
            issues.push(err);
        }

        for (index, command) in deploy.commands.iter().enumerate() {
            if command.trim().is_empty() {
                issues.push(Error::Config(format!("deploy.commands[{}] is empty", index)));
            }
        }
    }

    issues
}

/// Collapse a non-empty issue list into one fatal configuration error.
pub fn aggregate(issues: &[Error]) -> Error {
    let messages: Vec<String> = issues
        .iter()
        .map(|issue| match issue {
            Error::Config(message) => message.clone(),
            other => other.to_string(),
        })
        .collect();
    Error::Config(messages.join("; "))
}
