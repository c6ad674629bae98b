//! Display-callback seam between the core and whatever renders it
//!
//! Presentation lives outside the core; the core only needs three callbacks:
//! show a categorized notification, flip the busy indicator, ask a yes/no
//! question. [`BusyGuard`] pairs every busy-on with a busy-off.

/// Notification category
///
/// Each category carries a fixed display title; frontends pick colors and
/// styling per category on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Success,
    Error,
    Warning,
    Info,
}

impl Notice {
    /// The fixed title shown for this category.
    pub fn title(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Error => "Error",
            Self::Warning => "Warning",
            Self::Info => "Notice",
        }
    }
}

/// Callbacks the core invokes on its frontend
pub trait Frontend: Send + Sync {
    /// Shows a notification on the single shared presentation surface.
    fn notify(&self, notice: Notice, message: &str);

    /// Sets or clears the loading indicator.
    fn set_busy(&self, busy: bool);

    /// Asks the user a yes/no question, blocking until answered.
    fn confirm(&self, question: &str) -> bool;
}

/// RAII busy indicator: on while held, off when dropped
///
/// Dropping covers every exit path, early `?` returns included, so the
/// indicator cannot stick after a failed operation.
pub struct BusyGuard<'a> {
    frontend: &'a dyn Frontend,
}

impl<'a> BusyGuard<'a> {
    pub fn engage(frontend: &'a dyn Frontend) -> Self {
        frontend.set_busy(true);
        Self { frontend }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.frontend.set_busy(false);
    }
}
