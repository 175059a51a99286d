pub mod action_bar;
pub mod actions;
pub mod dispatch;
pub mod feature_window;
pub mod fence;
pub mod overlay;
pub mod settings_sync;
pub mod streaming;
pub mod timer;

pub use action_bar::{ActionBarController, ActionBarView};
pub use actions::resolve_actions;
pub use dispatch::{DispatchOutcome, DispatchRequest, Dispatcher, feature_window_anchor};
pub use feature_window::{FeatureView, FeatureWindow};
pub use overlay::controller::OverlayController;
pub use overlay::{OverlayMachine, OverlayView};
pub use settings_sync::{SaveError, SettingsSync};
pub use streaming::{StreamReconciler, StreamSession, StreamView};
