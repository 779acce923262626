//! Item classification.
//!
//! Two strategies find the items that represent reachability checks:
//! - [`TemplateClassifier`]: rules from the template catalog, applied per
//!   (host, linked template) pair. Also finds master (heartbeat) items.
//! - [`detect_by_tag`]: any item carrying the connectivity tag, no template
//!   configuration needed.

mod grouping;
mod tags;
mod template;
mod types;

pub use grouping::{group_by_host, group_by_template, group_ordered};
pub use tags::{detect_by_tag, DEFAULT_CONNECTION_TAG};
pub use template::{find_matching_item, TemplateClassifier};
pub use types::{ClassifiedItem, TagDetectionResult, TaggedHost, TaggedItem};
