use serde::Serialize;
use std::fmt;

/// Outcome of the latest acquisition or lookup action, as shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Status {
    #[default]
    Idle,
    LoadedFromCache {
        captured_at: String,
    },
    NoCacheFetching,
    Updating,
    Updated {
        captured_at: Option<String>,
    },
    OfflineUsingCache {
        captured_at: String,
    },
    NoData,
    Found,
    NoResults,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Status::Idle => "Ready",
            Status::LoadedFromCache { .. } => "Loaded from cache",
            Status::NoCacheFetching => "No cache, fetching",
            Status::Updating => "Updating",
            Status::Updated { .. } => "Updated",
            Status::OfflineUsingCache { .. } => "Offline, using cache",
            Status::NoData => "No data available",
            Status::Found => "Found",
            Status::NoResults => "No results",
        }
    }

    /// The "last updated" note that goes next to the label, when there is one.
    pub fn annotation(&self) -> Option<&str> {
        match self {
            Status::LoadedFromCache { captured_at } | Status::OfflineUsingCache { captured_at } => {
                Some(captured_at.as_str())
            }
            Status::Updated { captured_at } => captured_at.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.annotation() {
            Some(at) => write!(f, "{} (last updated {at})", self.label()),
            None => f.write_str(self.label()),
        }
    }
}
