//! Engines compiled into the launcher.

pub mod eob;
pub mod freescape;

use crate::plugin::MetaEngine;

/// Every engine family, in the order `list-engines` prints them.
pub fn static_plugins() -> Vec<Box<dyn MetaEngine>> {
    vec![
        Box::new(freescape::FreescapeMetaEngine),
        Box::new(eob::EobMetaEngine),
    ]
}
