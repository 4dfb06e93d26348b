//! Locale state machine.
//!
//! The application runs with one fixed [`LocaleTarget`]. It is applied twice:
//!
//! - **Pre-attach** ([`LocaleConfigurator::attach_base_context`]): derives a
//!   configuration context carrying the target so resources created before
//!   startup resolve against it.
//! - **Post-attach** ([`LocaleConfigurator::initialize_app_language`]):
//!   corrects the process-wide default locale state, which context
//!   substitution alone does not guarantee on every host.
//!
//! What each pass does depends on the host's [`CapabilityTier`] and is looked
//! up in a static table ([`plan`]); the configurator only executes the
//! resulting [`LocaleAction`] list and reports failures as [`LocaleError`].
//! Callers decide whether to log and continue.
//!
//! ```text
//!               attach_base_context          initialize_app_language
//!   Unset ────────────────────────► PreAttachApplied ───────────────► PostAttachApplied
//!     │                                                                    ▲
//!     └────────────────────────────────────────────────────────────────────┘
//!                        initialize_app_language
//! ```

mod configurator;
mod plan;
mod tier;
mod types;

pub use configurator::{LocaleApplication, LocaleConfigurator, LocaleError, LocaleState};
pub use plan::{plan, LocaleAction};
pub use tier::{CapabilityTier, LifecyclePhase, API_LOCALE_LIST, API_PER_APP_LOCALES};
pub use types::{Locale, LocaleList, LocaleParseError, LocaleTarget, DEFAULT_TARGET_LOCALE};
