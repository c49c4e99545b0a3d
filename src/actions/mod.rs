//! File actions module.
//!
//! Deletion of confirmed duplicates, either permanently (default) or to
//! the system trash.
//!
//! ```no_run
//! use dupewalk::actions::{delete_file, DeleteConfig};
//! use std::path::Path;
//!
//! let result = delete_file(Path::new("/path/to/duplicate.txt"), &DeleteConfig::trash());
//! ```

pub mod delete;

pub use delete::{
    delete_batch, delete_file, delete_to_trash, permanent_delete, preserves_copy,
    BatchDeleteResult, DeleteConfig, DeleteError, DeleteResult,
};
