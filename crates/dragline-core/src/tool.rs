//! Tools and the dispatch context handed to their controllers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable handle of a tool, assigned in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ToolId(pub(crate) usize);

impl ToolId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tool#{}", self.0)
    }
}

/// One editing mode: an identity plus its activation state.
///
/// A tool owns no geometry. Its controllers live in a [`crate::ToolChain`];
/// activation is managed by the [`crate::ToolBox`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    id: ToolId,
    name: String,
    active: bool,
    /// Active tools that currently force this tool off.
    suppressed_by: Vec<ToolId>,
    /// Activation state to restore once the last suppressor is gone.
    resume_active: bool,
}

impl Tool {
    pub fn new(id: ToolId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            active: false,
            suppressed_by: Vec::new(),
            resume_active: false,
        }
    }

    pub fn id(&self) -> ToolId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_suppressed(&self) -> bool {
        !self.suppressed_by.is_empty()
    }

    pub fn suppressed_by(&self) -> &[ToolId] {
        &self.suppressed_by
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Record a new suppressor. Returns `true` if this is the first one, in
    /// which case the current activation state is remembered.
    pub(crate) fn suppress(&mut self, by: ToolId) -> bool {
        if self.suppressed_by.contains(&by) {
            return false;
        }
        let first = self.suppressed_by.is_empty();
        if first {
            self.resume_active = self.active;
        }
        self.suppressed_by.push(by);
        first
    }

    /// Drop a suppressor. Returns the state to restore once no suppressor is
    /// left, or `None` while the tool is still suppressed.
    pub(crate) fn release(&mut self, by: ToolId) -> Option<bool> {
        let before = self.suppressed_by.len();
        self.suppressed_by.retain(|id| *id != by);
        if self.suppressed_by.len() == before || self.is_suppressed() {
            return None;
        }
        Some(std::mem::take(&mut self.resume_active))
    }
}

/// Activation change or notification requested from inside a dispatch.
///
/// Requests are applied by the tool box after the current dispatch returns,
/// so a controller can never change the set of active controllers while the
/// chain is iterating over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolRequest {
    Activate(ToolId),
    Deactivate(ToolId),
    Toggle(ToolId),
    RefreshViews(ToolId),
}

/// Read-only view of tool activation plus a queue of deferred requests.
#[derive(Debug)]
pub struct ToolContext<'a> {
    tools: &'a [Tool],
    requests: Vec<ToolRequest>,
}

impl<'a> ToolContext<'a> {
    pub fn new(tools: &'a [Tool]) -> Self {
        Self {
            tools,
            requests: Vec::new(),
        }
    }

    /// Look up a tool.
    ///
    /// # Panics
    /// If `id` was not issued for this set of tools.
    pub fn tool(&self, id: ToolId) -> &'a Tool {
        match self.tools.get(id.0) {
            Some(tool) => tool,
            None => panic!("unknown {id}: only {} tools are registered", self.tools.len()),
        }
    }

    pub fn is_active(&self, id: ToolId) -> bool {
        self.tool(id).is_active()
    }

    pub fn request_activate(&mut self, id: ToolId) {
        self.requests.push(ToolRequest::Activate(id));
    }

    pub fn request_deactivate(&mut self, id: ToolId) {
        self.requests.push(ToolRequest::Deactivate(id));
    }

    pub fn request_toggle(&mut self, id: ToolId) {
        self.requests.push(ToolRequest::Toggle(id));
    }

    /// Ask the views showing `id` to redraw.
    pub fn refresh_views(&mut self, id: ToolId) {
        self.requests.push(ToolRequest::RefreshViews(id));
    }

    pub fn pending_requests(&self) -> &[ToolRequest] {
        &self.requests
    }

    pub fn into_requests(self) -> Vec<ToolRequest> {
        self.requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suppress_remembers_state_once() {
        let mut tool = Tool::new(ToolId(0), "vertex");
        tool.set_active(true);

        assert!(tool.suppress(ToolId(1)));
        tool.set_active(false);
        assert!(!tool.suppress(ToolId(2)));
        assert!(tool.is_suppressed());

        assert_eq!(tool.release(ToolId(1)), None);
        assert_eq!(tool.release(ToolId(2)), Some(true));
        assert!(!tool.is_suppressed());
    }

    #[test]
    fn test_release_unknown_suppressor() {
        let mut tool = Tool::new(ToolId(0), "clip");
        assert_eq!(tool.release(ToolId(3)), None);
    }

    #[test]
    fn test_context_queues_requests() {
        let tools = vec![Tool::new(ToolId(0), "a"), Tool::new(ToolId(1), "b")];
        let mut ctx = ToolContext::new(&tools);
        ctx.request_toggle(ToolId(1));
        ctx.refresh_views(ToolId(0));

        assert!(!ctx.is_active(ToolId(1)));
        assert_eq!(
            ctx.into_requests(),
            vec![ToolRequest::Toggle(ToolId(1)), ToolRequest::RefreshViews(ToolId(0))]
        );
    }

    #[test]
    #[should_panic(expected = "unknown tool#5")]
    fn test_unknown_tool_panics() {
        let tools = vec![Tool::new(ToolId(0), "a")];
        let ctx = ToolContext::new(&tools);
        ctx.is_active(ToolId(5));
    }
}
