//! Access gateway for attachment downloads.
//!
//! A download is allowed only when the viewer participates in the thread named
//! by the route and the attachment was uploaded with a message of that same
//! thread. Every failed check ends in a [`DownloadDenied`]; callers are
//! expected to collapse all of them into one indistinguishable response.

use std::borrow::Cow;
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs::File;
use tracing::{debug, warn};

use crate::entities::ThreadLoad;
use crate::repositories::{AttachmentStore, MessageStore, ThreadStore, LINKED_MESSAGE_META_KEY};
use crate::types::DownloadDenied;
use crate::utils::coerce_id;

/// IDs carried by a download route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadRoute {
    pub thread_id: i64,
    pub attachment_id: i64,
}

impl DownloadRoute {
    pub fn new(thread_id: i64, attachment_id: i64) -> Self {
        Self {
            thread_id,
            attachment_id,
        }
    }

    /// Build a route from raw path segments, coercing each to an ID
    pub fn from_action_variables(thread_id: &str, attachment_id: &str) -> Self {
        Self::new(coerce_id(thread_id), coerce_id(attachment_id))
    }

    /// Match `/messages/{thread_id}/attachment/{attachment_id}`.
    ///
    /// Segments are percent-decoded before matching; one that does not decode
    /// to UTF-8 is taken as written. Any other shape returns `None` so the
    /// request can be left to the rest of the router.
    pub fn parse(path: &str) -> Option<Self> {
        let segments: Vec<Cow<'_, str>> = path
            .trim_matches('/')
            .split('/')
            .map(|segment| urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment)))
            .collect();
        let segments: Vec<&str> = segments.iter().map(|segment| &**segment).collect();

        match segments.as_slice() {
            ["messages", thread_id, "attachment", attachment_id] => {
                Some(Self::from_action_variables(thread_id, attachment_id))
            }
            _ => None,
        }
    }
}

/// An attachment the viewer may download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedDownload {
    pub thread_id: i64,
    pub attachment_id: i64,
    pub message_id: i64,
    pub mime_type: String,
    /// Absolute path of the stored file
    pub file_path: PathBuf,
    /// Base name sent to the client
    pub file_name: String,
}

/// An opened attachment ready to be streamed
#[derive(Debug)]
pub struct DownloadFile {
    pub download: AuthorizedDownload,
    pub file: File,
    /// Exact size in bytes at open time
    pub length: u64,
}

/// Decides whether a viewer may download an attachment
#[derive(Clone)]
pub struct AccessGateway {
    threads: Arc<dyn ThreadStore>,
    messages: Arc<dyn MessageStore>,
    attachments: Arc<dyn AttachmentStore>,
}

impl AccessGateway {
    pub fn new(
        threads: Arc<dyn ThreadStore>,
        messages: Arc<dyn MessageStore>,
        attachments: Arc<dyn AttachmentStore>,
    ) -> Self {
        Self {
            threads,
            messages,
            attachments,
        }
    }

    /// Run the participant, linkage and type checks.
    ///
    /// Store failures count as a failed check for the step they happen in.
    pub async fn authorize(
        &self,
        route: DownloadRoute,
        viewer_id: i64,
    ) -> Result<AuthorizedDownload, DownloadDenied> {
        let DownloadRoute {
            thread_id,
            attachment_id,
        } = route;

        // A thread that fails to load simply has no participants.
        let thread = fail_closed(
            self.threads
                .load_thread(thread_id, ThreadLoad::recipients_only())
                .await,
            "load thread",
        )
        .flatten();

        let is_participant = thread
            .as_ref()
            .is_some_and(|thread| thread.has_participant(viewer_id));
        if !is_participant {
            return Err(deny(route, DownloadDenied::Unauthorized));
        }

        let linked = fail_closed(
            self.attachments
                .attachment_meta(attachment_id, LINKED_MESSAGE_META_KEY)
                .await,
            "load attachment link",
        )
        .flatten();
        let message_id = linked.map_or(0, |raw| coerce_id(&raw));
        if message_id == 0 {
            return Err(deny(route, DownloadDenied::NotLinked));
        }

        let message = fail_closed(self.messages.load_message(message_id).await, "load message")
            .flatten();
        if message.map(|m| m.thread_id) != Some(thread_id) {
            return Err(deny(route, DownloadDenied::NotLinked));
        }

        let attachment = fail_closed(
            self.attachments.load_attachment(attachment_id).await,
            "load attachment",
        )
        .flatten();
        let Some(attachment) = attachment.filter(|a| a.is_attachment()) else {
            return Err(deny(route, DownloadDenied::NotAttachment));
        };

        let file_path = fail_closed(
            self.attachments.attached_file_path(attachment_id).await,
            "resolve attachment path",
        )
        .flatten()
        .ok_or_else(|| deny(route, DownloadDenied::NotFound))?;

        let file_name = file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| deny(route, DownloadDenied::NotFound))?;

        Ok(AuthorizedDownload {
            thread_id,
            attachment_id,
            message_id,
            mime_type: attachment.mime_type,
            file_path,
            file_name,
        })
    }

    /// Authorize, then open the stored file.
    ///
    /// A path that does not lead to a regular file is `NotFound`.
    pub async fn open(
        &self,
        route: DownloadRoute,
        viewer_id: i64,
    ) -> Result<DownloadFile, DownloadDenied> {
        let download = self.authorize(route, viewer_id).await?;

        let file = File::open(&download.file_path).await.map_err(|error| {
            debug!(path = %download.file_path.display(), %error, "attachment file unavailable");
            deny(route, DownloadDenied::NotFound)
        })?;

        let metadata = file.metadata().await.map_err(|error| {
            warn!(path = %download.file_path.display(), %error, "failed to stat attachment file");
            deny(route, DownloadDenied::NotFound)
        })?;
        if !metadata.is_file() {
            return Err(deny(route, DownloadDenied::NotFound));
        }

        debug!(
            thread_id = route.thread_id,
            attachment_id = route.attachment_id,
            length = metadata.len(),
            "attachment download authorized"
        );

        Ok(DownloadFile {
            download,
            file,
            length: metadata.len(),
        })
    }
}

fn fail_closed<T, E: Display>(result: Result<T, E>, step: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(step, %error, "attachment store failed, denying download");
            None
        }
    }
}

fn deny(route: DownloadRoute, reason: DownloadDenied) -> DownloadDenied {
    debug!(
        thread_id = route.thread_id,
        attachment_id = route.attachment_id,
        %reason,
        "attachment download denied"
    );
    reason
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Attachment, Message, Thread};
    use crate::repositories::InMemoryHost;
    use crate::types::{StoreError, StoreResult};
    use async_trait::async_trait;
    use std::io::Write;
    use tempfile::TempDir;

    const THREAD: i64 = 10;
    const OTHER_THREAD: i64 = 11;
    const MESSAGE: i64 = 100;
    const FOREIGN_MESSAGE: i64 = 101;
    const ATTACHMENT: i64 = 500;

    struct Fixture {
        host: InMemoryHost,
        gateway: AccessGateway,
        _dir: TempDir,
    }

    async fn fixture(file_bytes: Option<&[u8]>) -> Fixture {
        let dir = TempDir::new().unwrap();
        if let Some(bytes) = file_bytes {
            let mut file = std::fs::File::create(dir.path().join("report.pdf")).unwrap();
            file.write_all(bytes).unwrap();
        }

        let host = InMemoryHost::new().with_upload_dir(dir.path());
        host.insert_thread(THREAD, &[1, 2]).await;
        host.insert_thread(OTHER_THREAD, &[1, 3]).await;
        host.insert_message(MESSAGE, THREAD, 1).await;
        host.insert_message(FOREIGN_MESSAGE, OTHER_THREAD, 1).await;
        host.insert_attachment(Attachment::new(ATTACHMENT, "application/pdf", "report.pdf"))
            .await;
        host.link_attachment(ATTACHMENT, MESSAGE).await;

        let shared = Arc::new(host.clone());
        let gateway = AccessGateway::new(shared.clone(), shared.clone(), shared);
        Fixture {
            host,
            gateway,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_participant_can_download() {
        let bytes = vec![7u8; 1024];
        let fx = fixture(Some(&bytes)).await;

        let opened = fx
            .gateway
            .open(DownloadRoute::new(THREAD, ATTACHMENT), 2)
            .await
            .unwrap();

        assert_eq!(opened.length, 1024);
        assert_eq!(opened.download.mime_type, "application/pdf");
        assert_eq!(opened.download.file_name, "report.pdf");
        assert_eq!(opened.download.message_id, MESSAGE);
    }

    #[tokio::test]
    async fn test_non_participant_is_unauthorized() {
        let fx = fixture(Some(b"data")).await;

        let denied = fx.gateway.authorize(DownloadRoute::new(THREAD, ATTACHMENT), 3).await;
        assert_eq!(denied, Err(DownloadDenied::Unauthorized));
    }

    #[tokio::test]
    async fn test_anonymous_viewer_is_unauthorized() {
        let fx = fixture(Some(b"data")).await;

        let denied = fx
            .gateway
            .authorize(DownloadRoute::new(THREAD, ATTACHMENT), crate::NO_SESSION)
            .await;
        assert_eq!(denied, Err(DownloadDenied::Unauthorized));
    }

    #[tokio::test]
    async fn test_missing_thread_is_unauthorized() {
        let fx = fixture(Some(b"data")).await;

        let denied = fx.gateway.authorize(DownloadRoute::new(999, ATTACHMENT), 1).await;
        assert_eq!(denied, Err(DownloadDenied::Unauthorized));
    }

    #[tokio::test]
    async fn test_attachment_from_other_thread_is_not_linked() {
        let fx = fixture(Some(b"data")).await;
        fx.host.link_attachment(ATTACHMENT, FOREIGN_MESSAGE).await;

        // Viewer 1 is a participant of both threads.
        let denied = fx.gateway.authorize(DownloadRoute::new(THREAD, ATTACHMENT), 1).await;
        assert_eq!(denied, Err(DownloadDenied::NotLinked));
    }

    #[tokio::test]
    async fn test_unlinked_attachment_is_not_linked() {
        let fx = fixture(Some(b"data")).await;
        fx.host
            .insert_attachment(Attachment::new(501, "image/png", "loose.png"))
            .await;
        fx.host.set_attachment_meta(502, LINKED_MESSAGE_META_KEY, "").await;
        fx.host.insert_attachment(Attachment::new(502, "image/png", "blank.png")).await;
        fx.host.set_attachment_meta(503, LINKED_MESSAGE_META_KEY, "0").await;
        fx.host.insert_attachment(Attachment::new(503, "image/png", "zero.png")).await;

        for attachment_id in [501, 502, 503] {
            let denied = fx
                .gateway
                .authorize(DownloadRoute::new(THREAD, attachment_id), 1)
                .await;
            assert_eq!(denied, Err(DownloadDenied::NotLinked), "attachment {attachment_id}");
        }
    }

    #[tokio::test]
    async fn test_link_to_missing_message_is_not_linked() {
        let fx = fixture(Some(b"data")).await;
        fx.host.link_attachment(ATTACHMENT, 4040).await;

        let denied = fx.gateway.authorize(DownloadRoute::new(THREAD, ATTACHMENT), 1).await;
        assert_eq!(denied, Err(DownloadDenied::NotLinked));
    }

    #[tokio::test]
    async fn test_other_entity_type_is_rejected() {
        let fx = fixture(Some(b"data")).await;
        let mut page = Attachment::new(ATTACHMENT, "text/html", "report.pdf");
        page.entity_type = "page".to_string();
        fx.host.insert_attachment(page).await;

        let denied = fx.gateway.authorize(DownloadRoute::new(THREAD, ATTACHMENT), 1).await;
        assert_eq!(denied, Err(DownloadDenied::NotAttachment));
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let fx = fixture(None).await;

        let authorized = fx.gateway.authorize(DownloadRoute::new(THREAD, ATTACHMENT), 2).await;
        assert!(authorized.is_ok());

        let denied = fx.gateway.open(DownloadRoute::new(THREAD, ATTACHMENT), 2).await;
        assert!(matches!(denied, Err(DownloadDenied::NotFound)));
    }

    #[tokio::test]
    async fn test_directory_is_not_found() {
        let fx = fixture(Some(b"data")).await;
        fx.host
            .insert_attachment(Attachment::new(ATTACHMENT, "application/pdf", ""))
            .await;

        let denied = fx.gateway.authorize(DownloadRoute::new(THREAD, ATTACHMENT), 2).await;
        assert_eq!(denied, Err(DownloadDenied::NotFound));

        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("folder");
        std::fs::create_dir(&nested).unwrap();
        fx.host
            .insert_attachment(Attachment::new(
                ATTACHMENT,
                "application/pdf",
                nested.display().to_string(),
            ))
            .await;

        let denied = fx.gateway.open(DownloadRoute::new(THREAD, ATTACHMENT), 2).await;
        assert!(matches!(denied, Err(DownloadDenied::NotFound)));
    }

    struct BrokenStore;

    #[async_trait]
    impl ThreadStore for BrokenStore {
        async fn load_thread(&self, _: i64, _: ThreadLoad) -> StoreResult<Option<Thread>> {
            Err(StoreError::backend("connection reset"))
        }
    }

    #[async_trait]
    impl MessageStore for BrokenStore {
        async fn load_message(&self, _: i64) -> StoreResult<Option<Message>> {
            Err(StoreError::backend("connection reset"))
        }
    }

    #[tokio::test]
    async fn test_store_failures_fail_closed() {
        let fx = fixture(Some(b"data")).await;
        let host = Arc::new(fx.host.clone());

        let broken_threads = AccessGateway::new(Arc::new(BrokenStore), host.clone(), host.clone());
        assert_eq!(
            broken_threads.authorize(DownloadRoute::new(THREAD, ATTACHMENT), 1).await,
            Err(DownloadDenied::Unauthorized)
        );

        let broken_messages = AccessGateway::new(host.clone(), Arc::new(BrokenStore), host);
        assert_eq!(
            broken_messages.authorize(DownloadRoute::new(THREAD, ATTACHMENT), 1).await,
            Err(DownloadDenied::NotLinked)
        );
    }

    #[test]
    fn test_route_from_action_variables() {
        assert_eq!(
            DownloadRoute::from_action_variables("12", "40"),
            DownloadRoute::new(12, 40)
        );
        assert_eq!(
            DownloadRoute::from_action_variables("abc", "-3"),
            DownloadRoute::new(0, 3)
        );
    }

    #[test]
    fn test_route_parse() {
        assert_eq!(
            DownloadRoute::parse("/messages/12/attachment/40"),
            Some(DownloadRoute::new(12, 40))
        );
        assert_eq!(
            DownloadRoute::parse("messages/12abc/attachment/40/"),
            Some(DownloadRoute::new(12, 40))
        );
        assert_eq!(
            DownloadRoute::parse("/messages//attachment/x"),
            Some(DownloadRoute::new(0, 0))
        );

        for path in [
            "/messages/12",
            "/messages/12/attachment",
            "/messages/12/attachment/40/extra",
            "/messages/12/attachments/40",
            "/api/attachments/file-types",
            "/",
        ] {
            assert_eq!(DownloadRoute::parse(path), None, "path {path:?}");
        }
    }

    #[test]
    fn test_route_parse_decodes_segments() {
        assert_eq!(
            DownloadRoute::parse("/messages/%31%32/attachment/40"),
            Some(DownloadRoute::new(12, 40))
        );
        assert_eq!(
            DownloadRoute::parse("/%6Dessages/12/%61ttachment/%34%30"),
            Some(DownloadRoute::new(12, 40))
        );
        // %FF is not UTF-8, so the segment is coerced as written.
        assert_eq!(
            DownloadRoute::parse("/messages/%FF/attachment/40"),
            Some(DownloadRoute::new(0, 40))
        );
        assert_eq!(DownloadRoute::parse("/messages/12%2Fattachment/40"), None);
    }
}
