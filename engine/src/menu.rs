//! Context-menu triggers.

use comfort_types::{TabId, ToolId, ToolInvocationRequest};

/// Prefix on every menu item id the host registers for a tool.
pub const MENU_PREFIX: &str = "comfort-";

/// A click on one of the tool entries of the page context menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuClick {
    pub menu_item_id: String,
    pub selection_text: Option<String>,
    pub tab_id: Option<TabId>,
}

impl MenuClick {
    #[must_use]
    pub fn menu_item_id_for(tool: &ToolId) -> String {
        format!("{MENU_PREFIX}{tool}")
    }

    /// The tool this entry maps to. Ids without the prefix are used as-is.
    #[must_use]
    pub fn tool_id(&self) -> ToolId {
        let id = self
            .menu_item_id
            .strip_prefix(MENU_PREFIX)
            .unwrap_or(&self.menu_item_id);
        ToolId::new(id)
    }

    /// `None` when the click carried no selection; such clicks are ignored.
    #[must_use]
    pub fn into_request(self) -> Option<ToolInvocationRequest> {
        let tool_id = self.tool_id();
        let text = self.selection_text.filter(|text| !text.trim().is_empty())?;
        Some(ToolInvocationRequest {
            tool_id,
            text,
            origin_tab: self.tab_id,
        })
    }
}
