//! Page inventory shared by the web front end and the CLI.
//!
//! Kept free of any host dependency so navigation can be unit-tested natively.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Page {
    #[default]
    TrainingDashboard,
    Settings,
    TensorBoard,
}

impl Page {
    /// Path of the HTML fragment swapped into the content container.
    pub fn path(self) -> &'static str {
        match self {
            Page::TrainingDashboard => "/dashboard/training",
            Page::Settings => "/settings",
            Page::TensorBoard => "/tensorboard",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Page::TrainingDashboard => "Training Dashboard",
            Page::Settings => "Settings",
            Page::TensorBoard => "TensorBoard",
        }
    }

    /// Id of the navigation link that opens the page.
    pub fn link_id(self) -> &'static str {
        match self {
            Page::TrainingDashboard => "training-dashboard-link",
            Page::Settings => "settings-link",
            Page::TensorBoard => "tensorboard-link",
        }
    }

    /// Only the dashboard carries the training form.
    pub fn has_form(self) -> bool {
        matches!(self, Page::TrainingDashboard)
    }

    pub fn all() -> &'static [Page] {
        &[Page::TrainingDashboard, Page::Settings, Page::TensorBoard]
    }
}
