//! Presentation side effects (transient notices and the blocking
//! loading indicator) abstracted away from the host UI

use log::{debug, info};
use std::time::Duration;

/// Presentation layer the request functions report to
pub trait Notifier: Send + Sync {
    /// Shows a short lived non-blocking message
    fn show_notice(&self, message: &str, duration: Duration);

    /// Shows the blocking progress indicator with the provided text
    fn show_loading(&self, text: &str);

    /// Dismisses the progress indicator
    fn hide_loading(&self);
}

/// Notifier that writes everything to the log, used when there is no
/// UI host attached
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn show_notice(&self, message: &str, duration: Duration) {
        info!("Notice ({}ms): {}", duration.as_millis(), message);
    }

    fn show_loading(&self, text: &str) {
        debug!("Loading: {}", text);
    }

    fn hide_loading(&self) {
        debug!("Loading finished");
    }
}

/// Guard for the loading indicator, the indicator is hidden when the
/// guard is dropped so every exit path dismisses it exactly once
pub struct LoadingGuard<'a> {
    notifier: Option<&'a dyn Notifier>,
}

impl<'a> LoadingGuard<'a> {
    /// Shows the loading indicator when `show` is true, otherwise creates
    /// a guard that does nothing
    ///
    /// ## Arguments
    /// * `notifier` - The notifier to show the indicator with
    /// * `show`     - Whether the indicator should be shown
    /// * `text`     - The indicator text
    pub fn show(notifier: &'a dyn Notifier, show: bool, text: &str) -> Self {
        if !show {
            return Self { notifier: None };
        }

        notifier.show_loading(text);
        Self {
            notifier: Some(notifier),
        }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if let Some(notifier) = self.notifier.take() {
            notifier.hide_loading();
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{Event, RecordingNotifier};
    use super::*;

    #[test]
    fn test_guard_hides_on_drop() {
        let notifier = RecordingNotifier::default();
        {
            let _guard = LoadingGuard::show(&notifier, true, "loading...");
        }
        assert_eq!(
            notifier.events(),
            vec![
                Event::ShowLoading("loading...".to_string()),
                Event::HideLoading
            ]
        );
    }

    #[test]
    fn test_guard_disabled_does_nothing() {
        let notifier = RecordingNotifier::default();
        drop(LoadingGuard::show(&notifier, false, "loading..."));
        assert!(notifier.events().is_empty());
    }
}
