//! Process-wide singletons.

use std::sync::Arc;

use crate::codec::Codec;
use crate::context::ProcessContext;
use crate::fault::FaultHandler;
use crate::image::ImageLoader;
use crate::subsystems::LazyDatabase;

/// Everything startup builds that lives for the rest of the process.
///
/// Assembled only after every synchronous startup step has succeeded and
/// stored once; readers never see a partially built set.
#[derive(Clone, Debug)]
pub struct ProcessSingletons {
    pub context: ProcessContext,
    pub faults: Arc<FaultHandler>,
    pub codec: Arc<Codec>,
    pub image_loader: Arc<ImageLoader>,
    pub database: Arc<LazyDatabase>,
}
