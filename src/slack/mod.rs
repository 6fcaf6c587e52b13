//! Chat platform adapter: Block Kit types, rendering to and decoding from
//! them, and the `views.*` API behind the [`RenderApi`] trait.
//!
//! | Module   | Responsibility                                          |
//! |----------|---------------------------------------------------------|
//! | `blocks` | serde model of the Block Kit subset in use              |
//! | `render` | `FormView` → modal view                                 |
//! | `decode` | modal view → `FormView` / `StateBlob`                   |
//! | `home`   | home tab with report history                            |
//! | `client` | `SlackClient`, the reqwest-backed `RenderApi`           |
//! | `memory` | `InMemoryPlatform`, an in-process `RenderApi` for tests |

use async_trait::async_trait;

use report_common::VersionToken;

use crate::errors::RenderError;

pub mod blocks;
pub mod client;
pub mod decode;
pub mod home;
pub mod memory;
pub mod render;

pub use blocks::SlackView;
pub use client::SlackClient;
pub use memory::InMemoryPlatform;

/// The platform's view API.
///
/// Views returned from `open_view`, `update_view` and `fetch_view` carry the
/// platform-assigned `id` and `hash`; the hash is the version token the next
/// update must present.
#[async_trait]
pub trait RenderApi: Send + Sync {
    async fn open_view(&self, trigger_id: &str, view: &SlackView) -> Result<SlackView, RenderError>;

    /// Replace a view. Fails with `ConcurrencyConflict` if `version` is stale.
    async fn update_view(
        &self,
        view_id: &str,
        version: &VersionToken,
        view: &SlackView,
    ) -> Result<SlackView, RenderError>;

    /// The latest known revision of a view.
    async fn fetch_view(&self, view_id: &str) -> Result<SlackView, RenderError>;

    async fn publish_home(&self, user_id: &str, view: &SlackView) -> Result<(), RenderError>;
}
