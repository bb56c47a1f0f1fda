//! Shared application state for the gateway

use std::sync::Arc;

use msgat_attachments::{
    AccessGateway, FileTypeClassifier, PluginOptions, SessionStore, UploadPolicy,
};

/// Everything a request handler needs, built once at startup
#[derive(Clone)]
pub struct GatewayState {
    /// Download authorization
    pub access: AccessGateway,
    /// Resolves bearer tokens to viewers
    pub sessions: Arc<dyn SessionStore>,
    /// File-type table, shared with whoever registers hooks
    pub classifier: Arc<FileTypeClassifier>,
    /// Options as loaded at startup
    pub options: Arc<PluginOptions>,
    upload_policy: Arc<UploadPolicy>,
}

impl GatewayState {
    pub fn new(
        access: AccessGateway,
        sessions: Arc<dyn SessionStore>,
        classifier: Arc<FileTypeClassifier>,
        options: PluginOptions,
    ) -> Self {
        let upload_policy = Arc::new(UploadPolicy::from_options(&options));
        Self {
            access,
            sessions,
            classifier,
            options: Arc::new(options),
            upload_policy,
        }
    }

    pub fn upload_policy(&self) -> &UploadPolicy {
        &self.upload_policy
    }
}

/// Wrap the state for use as router state
pub fn create_gateway_state(
    access: AccessGateway,
    sessions: Arc<dyn SessionStore>,
    classifier: Arc<FileTypeClassifier>,
    options: PluginOptions,
) -> Arc<GatewayState> {
    Arc::new(GatewayState::new(access, sessions, classifier, options))
}
