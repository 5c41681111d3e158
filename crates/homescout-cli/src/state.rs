// SPDX-License-Identifier: AGPL-3.0
// Homescout CLI - Application State

use homescout_core::{
    AppError, AppSettings, AuthClient, RestPropertyStore, SyncEvent, Synchronizer,
};
use std::sync::Arc;

/// Backend clients and the synchronizer shared by every command
pub struct AppState {
    pub settings: AppSettings,
    pub auth: Arc<AuthClient>,
    pub sync: Synchronizer,
    /// Non-fatal problems hit while loading user data
    pub notices: Vec<String>,
}

impl AppState {
    /// Connect to the backend and load any saved session
    pub async fn connect(settings: AppSettings) -> Result<Self, AppError> {
        let auth = Arc::new(AuthClient::new(&settings)?);
        let store = Arc::new(RestPropertyStore::new(&settings)?);
        let sync = Synchronizer::new(auth.clone(), store);

        let mut events = sync.events();
        sync.initialize().await;

        let mut notices = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let SyncEvent::RefreshFailed { error, .. } = event {
                notices.push(format!("Could not load your saved properties: {}", error));
            }
        }

        Ok(Self {
            settings,
            auth,
            sync,
            notices,
        })
    }
}
