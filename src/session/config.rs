/// Lifecycle rules the product has not pinned down, kept tunable.
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    /// Allow finalizing a running session directly. When set, the session is
    /// paused at the finalize timestamp before the description and tags are
    /// attached. When unset, callers must pause explicitly first.
    pub finalize_from_running: bool,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            finalize_from_running: false,
        }
    }
}
