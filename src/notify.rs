use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tracing::info;

use crate::config::MailConfig;
use crate::error::{DublineError, Result};
use crate::workspace::{Artifact, ArtifactKind};

/// Sends finished artifacts to the requester
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, recipient: &str, artifacts: &[Artifact]) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct MailAttachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl MailAttachment {
    pub async fn from_artifact(artifact: &Artifact) -> Result<Self> {
        let bytes = tokio::fs::read(&artifact.path).await.map_err(|e| {
            DublineError::Delivery(format!("cannot read {}: {}", artifact.path.display(), e))
        })?;
        let file_name = artifact
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| artifact.kind.file_name().to_string());
        let content_type = match artifact.kind {
            ArtifactKind::SourceVideo | ArtifactKind::FinalVideo | ArtifactKind::SubtitledVideo => "video/mp4",
            ArtifactKind::DubbedAudio => "audio/wav",
            ArtifactKind::ExtractedAudio => "audio/mpeg",
            ArtifactKind::Subtitles => "application/octet-stream",
        };
        Ok(Self {
            file_name,
            content_type: content_type.to_string(),
            bytes,
        })
    }
}

/// SMTP delivery over a STARTTLS relay
pub struct Mailer {
    config: MailConfig,
}

impl Mailer {
    pub fn new(config: MailConfig) -> Result<Self> {
        if config.from.is_empty() || config.password.is_none() {
            return Err(DublineError::Config(
                "mail sender and password must be configured".to_string(),
            ));
        }
        Ok(Self { config })
    }

    pub fn build_message(&self, recipient: &str, attachments: Vec<MailAttachment>) -> Result<Message> {
        let from: Mailbox = self
            .config
            .from
            .parse()
            .map_err(|e| DublineError::Config(format!("invalid sender address: {}", e)))?;
        let to: Mailbox = recipient
            .parse()
            .map_err(|e| DublineError::Validation(format!("invalid recipient address '{}': {}", recipient, e)))?;

        let mut body = MultiPart::mixed().singlepart(SinglePart::plain(self.config.body.clone()));
        for attachment in attachments {
            let content_type = ContentType::parse(&attachment.content_type)
                .map_err(|e| DublineError::Delivery(format!("bad content type: {}", e)))?;
            body = body.singlepart(Attachment::new(attachment.file_name).body(attachment.bytes, content_type));
        }

        Message::builder()
            .from(from)
            .to(to)
            .subject(self.config.subject.clone())
            .multipart(body)
            .map_err(|e| DublineError::Delivery(format!("failed to build message: {}", e)))
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let username = if self.config.username.is_empty() {
            self.config.from.clone()
        } else {
            self.config.username.clone()
        };
        let password = self.config.password.clone().unwrap_or_default();

        Ok(AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.relay)
            .map_err(|e| DublineError::Delivery(format!("invalid relay {}: {}", self.config.relay, e)))?
            .port(self.config.port)
            .credentials(Credentials::new(username, password))
            .timeout(Some(Duration::from_secs(self.config.timeout_secs)))
            .build())
    }

    pub async fn send(&self, recipient: &str, artifacts: &[Artifact]) -> Result<()> {
        let mut attachments = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            attachments.push(MailAttachment::from_artifact(artifact).await?);
        }

        let message = self.build_message(recipient, attachments)?;
        self.transport()?
            .send(message)
            .await
            .map_err(|e| DublineError::Delivery(format!("SMTP send failed: {}", e)))?;

        info!("Email sent to {} with {} attachments", recipient, artifacts.len());
        Ok(())
    }
}

#[async_trait]
impl Notifier for Mailer {
    async fn deliver(&self, recipient: &str, artifacts: &[Artifact]) -> Result<()> {
        self.send(recipient, artifacts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailer() -> Mailer {
        Mailer::new(MailConfig {
            enabled: true,
            from: "dubline@example.org".to_string(),
            password: Some("app-password".to_string()),
            ..MailConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_message_has_subject_and_attachments() {
        let attachments = vec![
            MailAttachment {
                file_name: "final_output_video.mp4".to_string(),
                content_type: "video/mp4".to_string(),
                bytes: vec![0, 1, 2, 3],
            },
            MailAttachment {
                file_name: "subtitles.ass".to_string(),
                content_type: "application/octet-stream".to_string(),
                bytes: b"[Script Info]".to_vec(),
            },
        ];

        let message = mailer().build_message("teacher@school.in", attachments).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Your Translated Video and Subtitles"));
        assert!(raw.contains("To: teacher@school.in"));
        assert!(raw.contains("filename=\"final_output_video.mp4\""));
        assert!(raw.contains("filename=\"subtitles.ass\""));
        assert!(raw.contains("Content-Type: text/plain"));
        // undo quoted-printable soft line breaks before checking the body text
        let unfolded = raw.replace("=\r\n", "");
        assert!(unfolded.contains("Please find them attached."));
    }

    #[test]
    fn test_rejects_bad_recipient() {
        let err = mailer().build_message("not an address", Vec::new()).unwrap_err();
        assert!(matches!(err, DublineError::Validation(_)));
    }

    #[test]
    fn test_requires_credentials() {
        assert!(Mailer::new(MailConfig::default()).is_err());
    }

    #[tokio::test]
    async fn test_attachment_content_type_from_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subtitles.ass");
        std::fs::write(&path, "x").unwrap();

        let attachment = MailAttachment::from_artifact(&Artifact {
            kind: ArtifactKind::Subtitles,
            path,
        })
        .await
        .unwrap();
        assert_eq!(attachment.file_name, "subtitles.ass");
        assert_eq!(attachment.content_type, "application/octet-stream");
    }
}
