use std::sync::Arc;

use chrono::FixedOffset;
use serde::Serialize;

use crate::poc::PocStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PocStore>,
    /// Calendar days are read in this offset.
    pub reference_offset: FixedOffset,
}

/* -------------------------
   API DTOs
--------------------------*/

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}
