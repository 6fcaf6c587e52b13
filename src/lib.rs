//! Daily machine-report form served over the Slack interactivity webhook.
//!
//! | Module      | Role                                                     |
//! |-------------|----------------------------------------------------------|
//! | `config`    | `report.toml` plus environment overrides                 |
//! | `telemetry` | tracing subscriber setup                                 |
//! | `data`      | spreadsheet data service client and in-memory double     |
//! | `catalog`   | single-flight cache of reference lists                   |
//! | `form`      | build, mutate, and extract the progressive form          |
//! | `slack`     | Block Kit types, rendering, decoding, and the views API  |
//! | `events`    | decode raw webhook payloads into typed events            |
//! | `dispatch`  | route events to the right render or persistence step     |
//! | `api`       | axum handlers for the webhook                            |
//! | `server`    | HTTP listener and graceful shutdown                      |

pub mod api;
pub mod catalog;
pub mod config;
pub mod data;
pub mod dispatch;
pub mod errors;
pub mod events;
pub mod form;
pub mod server;
pub mod slack;
pub mod telemetry;
