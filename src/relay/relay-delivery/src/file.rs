/*
 * vSMTP mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/

use anyhow::Context;
use relay_common::Session;
use relay_engine::{replace_path_variables, Processor};

/// Parameters of the `file` processor.
#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileParams {
    /// Folder receiving the messages, created if missing.
    pub path: std::path::PathBuf,
    /// Name of each file, see [`replace_path_variables`].
    #[serde(default = "FileParams::default_filename")]
    pub filename: String,
}

impl FileParams {
    fn default_filename() -> String {
        "${iso8601}.eml".to_string()
    }
}

/// Copy the raw message into a folder.
#[derive(Debug)]
pub struct FileProcessor {
    path: std::path::PathBuf,
    filename: String,
}

impl FileProcessor {
    /// Create the folder.
    ///
    /// # Errors
    ///
    /// * the path is empty
    /// * the folder cannot be created
    pub fn new(params: FileParams) -> anyhow::Result<Self> {
        if params.path.as_os_str().is_empty() {
            anyhow::bail!("the file processor requires a path");
        }

        std::fs::create_dir_all(&params.path)
            .with_context(|| format!("failed to create {}", params.path.display()))?;

        Ok(Self {
            path: params.path,
            filename: params.filename,
        })
    }
}

#[async_trait::async_trait]
impl Processor for FileProcessor {
    #[tracing::instrument(name = "file", skip_all)]
    async fn on_mail(&self, session: &Session) -> anyhow::Result<()> {
        let source = session
            .body_path
            .as_ref()
            .context("the message has not been persisted")?;
        let target = self.path.join(replace_path_variables(&self.filename, session));

        tokio::fs::copy(source, &target).await.with_context(|| {
            format!(
                "failed to copy {} to {}",
                source.display(),
                target.display()
            )
        })?;

        tracing::debug!(to = %target.display(), "Message written.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{FileParams, FileProcessor};
    use relay_common::{addr, Session};
    use relay_engine::Processor;

    fn session(body_path: Option<std::path::PathBuf>) -> Session {
        let mut session = Session::new(
            "127.0.0.1:49152".parse().unwrap(),
            "127.0.0.1:10025".parse().unwrap(),
            "relay.test",
            ["main"],
        );
        session.envelope.mail_from = Some(addr!("john@doe.com"));
        session.body_path = body_path;
        session
    }

    #[tokio::test]
    async fn copy_the_message() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("cache.eml");
        std::fs::write(&source, "Subject: hello\r\n\r\nbody\r\n").unwrap();

        let output = dir.path().join("out").join("nested");
        let processor = FileProcessor::new(FileParams {
            path: output.clone(),
            filename: "${from}-${id}.eml".to_string(),
        })
        .unwrap();
        assert!(output.is_dir());

        let session = session(Some(source));
        processor.on_mail(&session).await.unwrap();

        pretty_assertions::assert_eq!(
            std::fs::read_to_string(output.join(format!("john@doe.com-{}.eml", session.id)))
                .unwrap(),
            "Subject: hello\r\n\r\nbody\r\n"
        );
    }

    #[rstest::rstest]
    #[case("../escape", ".._escape.eml")]
    #[case("..", "__.eml")]
    #[case("weekly/report", "weekly_report.eml")]
    #[tokio::test]
    async fn subject_stays_in_the_folder(#[case] subject: &str, #[case] expected: &str) {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("cache.eml");
        std::fs::write(&source, "Subject: x\r\n\r\nbody\r\n").unwrap();

        let output = dir.path().join("out");
        let processor = FileProcessor::new(FileParams {
            path: output.clone(),
            filename: "${subject}.eml".to_string(),
        })
        .unwrap();

        let mut session = session(Some(source));
        session.message = Some(relay_mail_parser::ParsedMail {
            headers: vec![("Subject".to_string(), subject.to_string())],
            body: String::new(),
        });
        processor.on_mail(&session).await.unwrap();

        pretty_assertions::assert_eq!(
            std::fs::read_dir(&output)
                .unwrap()
                .map(|entry| entry.unwrap().file_name().into_string().unwrap())
                .collect::<Vec<_>>(),
            vec![expected.to_string()]
        );
    }

    #[tokio::test]
    async fn message_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let processor = FileProcessor::new(FileParams {
            path: dir.path().to_path_buf(),
            filename: "${id}.eml".to_string(),
        })
        .unwrap();

        assert!(processor.on_mail(&session(None)).await.is_err());
    }

    #[test]
    fn params() {
        let params =
            serde_json::from_value::<FileParams>(serde_json::json!({ "path": "/tmp/relay" }))
                .unwrap();
        pretty_assertions::assert_eq!(params.filename, "${iso8601}.eml");

        assert!(serde_json::from_value::<FileParams>(serde_json::json!({})).is_err());
        assert!(FileProcessor::new(FileParams {
            path: std::path::PathBuf::new(),
            filename: String::new(),
        })
        .is_err());
    }
}
