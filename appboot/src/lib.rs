//! Appboot - process bootstrap orchestration for the assistant application.
//!
//! This library brings the application's mutually dependent subsystems into a
//! consistent running state and tears them down again on termination:
//!
//! 1. [`fault`] - process-wide fault handler, installed before anything else
//! 2. [`codec`] - the shared structured-data codec
//! 3. [`subsystems`] - preference bootstrap, synchronous initializers and the
//!    lazily constructed database handle
//! 4. [`locale`] - the two-pass locale state machine
//! 5. [`tasks`] - supervised background warm-up
//! 6. [`image`] - the shared image loader with bounded memory and disk tiers
//! 7. [`app`] - the lifecycle entry points tying it all together
//!
//! The host runtime is modelled by [`context::ProcessContext`] and the
//! [`platform::Platform`] trait; [`simulated`] provides an in-memory host for
//! running the lifecycle off-device.

pub mod app;
pub mod codec;
pub mod context;
pub mod fault;
pub mod image;
pub mod locale;
pub mod logging;
pub mod platform;
pub mod simulated;
pub mod subsystems;
pub mod tasks;
