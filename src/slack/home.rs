use report_common::keys::OPEN_FORM_ACTION_ID;
use report_common::{FactoryId, HistoryEntry};

use super::blocks::{Block, Element, SlackView, Text};

/// Home tabs are limited to 100 blocks; each entry takes two.
pub const MAX_HISTORY_ENTRIES: usize = 45;

/// The home tab: a header, the open-form button, and recent reports.
pub fn render_home(factory: &FactoryId, history: &[HistoryEntry]) -> SlackView {
    let mut blocks = vec![
        Block::Header {
            block_id: None,
            text: Text::plain("Daily reports"),
        },
        Block::Actions {
            block_id: None,
            elements: vec![Element::Button {
                action_id: OPEN_FORM_ACTION_ID.to_string(),
                text: Text::plain("Write a daily report"),
                value: Some(factory.to_string()),
                style: Some("primary".to_string()),
            }],
        },
    ];

    for entry in history.iter().take(MAX_HISTORY_ENTRIES) {
        blocks.push(Block::Divider { block_id: None });
        blocks.push(Block::Section {
            block_id: None,
            text: Some(Text::mrkdwn(summary(entry))),
        });
    }

    SlackView::home(blocks)
}

fn summary(entry: &HistoryEntry) -> String {
    format!(
        "*Reporter:* {}\n*Sent:* {}\n*Machine:* {}\n*Product:* {}\n*Defects:* {}\n*Details:* {}",
        entry.reporter,
        entry.timestamp,
        entry.machine_no,
        entry.product_name,
        entry.defect,
        entry.details
    )
}
