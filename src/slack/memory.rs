use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use report_common::VersionToken;

use super::{RenderApi, SlackView};
use crate::errors::RenderError;

/// In-process stand-in for the platform's view store.
///
/// Hashes are fresh UUIDs per revision, so a stale token is detected the same
/// way the real platform does it. Tests can inject transport failures or
/// simulate another writer winning every race.
#[derive(Default)]
pub struct InMemoryPlatform {
    views: Mutex<HashMap<String, SlackView>>,
    homes: Mutex<Vec<(String, SlackView)>>,
    opened: Mutex<Vec<String>>,
    updates: Mutex<Vec<String>>,
    fail: AtomicBool,
    contended: AtomicBool,
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent call fails with a transport error.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// When set, another writer bumps the view just before every update.
    pub fn set_contended(&self, contended: bool) {
        self.contended.store(contended, Ordering::SeqCst);
    }

    /// Simulate a concurrent edit: issue a new hash for `view_id`.
    pub fn bump(&self, view_id: &str) -> Option<VersionToken> {
        let mut views = self.views.lock().ok()?;
        let view = views.get_mut(view_id)?;
        let hash = new_hash();
        view.hash = Some(hash.clone());
        Some(VersionToken::new(hash))
    }

    /// Insert a view as if the platform had opened it; returns the stored copy.
    pub fn seed(&self, view: &SlackView) -> SlackView {
        self.store(None, view)
    }

    pub fn view(&self, view_id: &str) -> Option<SlackView> {
        self.views.lock().ok()?.get(view_id).cloned()
    }

    /// Trigger ids passed to `open_view`, in call order.
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().map(|o| o.clone()).unwrap_or_default()
    }

    /// View ids successfully updated, in call order.
    pub fn updates(&self) -> Vec<String> {
        self.updates.lock().map(|u| u.clone()).unwrap_or_default()
    }

    /// Home views published, as `(user_id, view)`.
    pub fn homes(&self) -> Vec<(String, SlackView)> {
        self.homes.lock().map(|h| h.clone()).unwrap_or_default()
    }

    fn check(&self, method: &str) -> Result<(), RenderError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RenderError::Transport {
                method: method.to_string(),
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn store(&self, id: Option<&str>, view: &SlackView) -> SlackView {
        let mut stored = view.clone();
        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| format!("V{}", Uuid::new_v4().simple()));
        stored.id = Some(id.clone());
        stored.hash = Some(new_hash());
        if let Ok(mut views) = self.views.lock() {
            views.insert(id, stored.clone());
        }
        stored
    }
}

fn new_hash() -> String {
    Uuid::new_v4().simple().to_string()
}

#[async_trait]
impl RenderApi for InMemoryPlatform {
    async fn open_view(&self, trigger_id: &str, view: &SlackView) -> Result<SlackView, RenderError> {
        self.check("views.open")?;
        if let Ok(mut opened) = self.opened.lock() {
            opened.push(trigger_id.to_string());
        }
        Ok(self.store(None, view))
    }

    async fn update_view(
        &self,
        view_id: &str,
        version: &VersionToken,
        view: &SlackView,
    ) -> Result<SlackView, RenderError> {
        self.check("views.update")?;
        if self.contended.load(Ordering::SeqCst) {
            self.bump(view_id);
        }

        let current = self
            .view(view_id)
            .ok_or_else(|| RenderError::ViewUnavailable {
                view_id: view_id.to_string(),
            })?;
        if current.hash.as_deref() != Some(version.as_str()) {
            return Err(RenderError::ConcurrencyConflict {
                view_id: view_id.to_string(),
            });
        }

        let stored = self.store(Some(view_id), view);
        if let Ok(mut updates) = self.updates.lock() {
            updates.push(view_id.to_string());
        }
        Ok(stored)
    }

    async fn fetch_view(&self, view_id: &str) -> Result<SlackView, RenderError> {
        self.check("views.get")?;
        self.view(view_id).ok_or_else(|| RenderError::ViewUnavailable {
            view_id: view_id.to_string(),
        })
    }

    async fn publish_home(&self, user_id: &str, view: &SlackView) -> Result<(), RenderError> {
        self.check("views.publish")?;
        if let Ok(mut homes) = self.homes.lock() {
            homes.push((user_id.to_string(), view.clone()));
        }
        Ok(())
    }
}
