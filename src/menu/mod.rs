//! Menu hierarchy engine
//!
//! Synchronous, I/O-free logic over an in-memory snapshot of navigation
//! menus: validation, tree building, ordering and queries, and the
//! mutation operations that keep the parent graph unique-named, rooted and
//! acyclic. Callers that share a store across requests must serialize
//! mutations themselves (see `crate::service`).

pub mod error;
pub mod model;
pub mod query;
pub mod store;
pub mod transfer;
pub mod tree;
pub mod validator;

pub use error::{BatchOutcome, FieldError, MenuError, MenuResult, ValidationErrors};
pub use model::{
    CreateMenu, DuplicateOverrides, ImportRecord, MenuId, MenuNode, MenuPatch, MenuRecord,
    MenuTarget, ReorderItem,
};
pub use query::{compute_stats, filter, paginate, ListParams, MenuFilter, MenuStats, Page, PageMeta, ParentFilter};
pub use store::{BulkReport, ChangeSet, Deletion, ImportReport, MenuStore};
pub use transfer::{TransferError, TransferFormat};
pub use tree::{build_tree, MenuForest};
pub use validator::DeletionPlan;
