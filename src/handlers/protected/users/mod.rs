pub mod assignments;
pub mod collection;
pub mod record;

pub use collection::get as collection_get;
pub use collection::post as collection_post;

pub use record::delete as record_delete;
pub use record::get as record_get;
pub use record::patch as record_patch;
pub use record::roles as roles_get;
pub use record::set_active as record_set_active;

pub use assignments::delete as assignments_delete;
pub use assignments::get as assignments_get;
pub use assignments::post as assignments_post;
